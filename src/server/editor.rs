//! server::editor
//!
//! The editor page: a Quill instance preloaded with the rendered page.
//! Quill itself is served from `/assets`.

use crate::store::Page;

const STYLE: &str = r#"
<style>
    body {
        font-family: sans-serif;
        margin: 0 auto;
        max-width: 60em;
    }

    #editor {
        height: 60vh;
    }

    #save {
        border: 1px solid #000;
        border-radius: 3px;
        background: transparent;
        cursor: pointer;
        font-size: 100%;
        margin-top: 10px;
        padding: 6px;
    }

    #updated-banner {
        background: #fffec1;
        margin: 15px 0;
        padding: 15px;
    }
</style>
"#;

const SCRIPT: &str = r#"
<script>
    const quill = new Quill('#editor', {
        theme: 'snow',
        modules: {
            toolbar: [
                [{ header: [1, 2, 3, false] }],
                ['bold', 'italic', 'underline', 'strike'],
                [{ list: 'ordered' }, { list: 'bullet' }],
                ['blockquote', 'code-block', 'link', 'image'],
            ],
        },
    })

    document.querySelector('form').addEventListener('formdata', (event) => {
        event.formData.append('content', quill.root.innerHTML)
    })
</script>
"#;

/// Text shown after a successful save.
pub const SAVED_BANNER: &str = "Update was successful, but may take a few minutes to be applied.";

/// Render the editor for `page`. `saved` adds the success banner.
pub fn render(page: &Page, saved: bool) -> String {
    let title = page
        .title
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "Edit page".to_string());

    let banner = if saved {
        format!("    <div id=\"updated-banner\">{SAVED_BANNER}</div>\n")
    } else {
        String::new()
    };

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\" />\n\
         <title>{title}</title>\n\
         <link href=\"/assets/quill.snow.css\" rel=\"stylesheet\" />\n\
         <script src=\"/assets/quill.js\"></script>\n\
         {STYLE}\
         </head>\n\
         <body>\n\
         <form method=\"post\">\n\
         {banner}\
         \x20   <div id=\"editor\">{content}</div>\n\
         \x20   <button id=\"save\" type=\"submit\">Save Changes</button>\n\
         </form>\n\
         {SCRIPT}\
         </body>\n\
         </html>\n",
        content = page.html,
    )
}

/// Minimal HTML escaping for text nodes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
