//! server
//!
//! HTTP surface of the editor.
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/ready` | 200 |
//! | GET | `/` | 307 to the configured redirect |
//! | GET | `/edit/*path` | editor for the page |
//! | POST | `/edit/*path` | save (form field `content`), then editor |
//! | GET | `/status` | sync status and HEAD as JSON (no error text) |
//! | GET | `/assets/*` | static files, when an assets directory is set |
//!
//! Editing and `/status` require an identity in `X-Forwarded-Email` unless
//! anonymous editing is enabled. The store is synchronous; every call into it
//! runs on the blocking pool.

mod editor;
mod error;

pub use error::AppError;

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::core::types::{Author, PagePath};
use crate::store::{Page, Store};
use crate::sync::{SyncHandle, SyncStatus};

/// Header carrying the authenticated identity, set by the fronting proxy.
pub const IDENTITY_HEADER: &str = "x-forwarded-email";

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub store: Arc<Store>,
    pub sync: SyncHandle,
    pub redirect: String,
    pub allow_anonymous: bool,
}

#[derive(Debug, Deserialize)]
struct EditForm {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    head: Option<String>,
    last_commit: Option<LastCommit>,
    sync: SyncStatus,
}

#[derive(Debug, Serialize)]
struct LastCommit {
    summary: String,
    time: chrono::DateTime<chrono::Utc>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>, assets_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/ready", get(|| async { StatusCode::OK }))
        .route("/", get(redirect))
        .route("/edit/*path", get(show_page).post(save_page))
        .route("/status", get(status));

    let router = match assets_dir {
        Some(dir) => router.nest_service("/assets", ServeDir::new(dir)),
        None => router,
    };

    router.with_state(state)
}

async fn redirect(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.redirect)
}

fn authenticate(headers: &HeaderMap, allow_anonymous: bool) -> Result<Author, AppError> {
    let value = headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok());
    let author = Author::from_header(value);

    if author.is_anonymous() && !allow_anonymous {
        return Err(AppError::Unauthenticated);
    }
    Ok(author)
}

async fn read_page(store: Arc<Store>, page: PagePath) -> Result<Page, AppError> {
    let path = page.clone();
    tokio::task::spawn_blocking(move || store.read(&path))
        .await??
        .ok_or_else(|| AppError::NotFound(format!("no document for {page}")))
}

async fn show_page(
    State(state): State<Arc<AppState>>,
    UrlPath(path): UrlPath<String>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    authenticate(&headers, state.allow_anonymous)?;
    let page = PagePath::new(path).map_err(|e| AppError::NotFound(e.to_string()))?;

    tracing::info!(%page, "reading page");
    let rendered = read_page(Arc::clone(&state.store), page).await?;
    Ok(Html(editor::render(&rendered, false)))
}

async fn save_page(
    State(state): State<Arc<AppState>>,
    UrlPath(path): UrlPath<String>,
    headers: HeaderMap,
    Form(form): Form<EditForm>,
) -> Result<Html<String>, AppError> {
    let author = authenticate(&headers, state.allow_anonymous)?;
    let page = PagePath::new(path).map_err(|e| AppError::NotFound(e.to_string()))?;

    tracing::info!(%page, "staging page update");
    let store = Arc::clone(&state.store);
    let target = page.clone();
    tokio::task::spawn_blocking(move || store.stage(&target, &form.content, &author)).await??;

    state.sync.request();

    let rendered = read_page(Arc::clone(&state.store), page).await?;
    Ok(Html(editor::render(&rendered, true)))
}

async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusBody>, AppError> {
    authenticate(&headers, state.allow_anonymous)?;
    let store = Arc::clone(&state.store);
    let last = tokio::task::spawn_blocking(move || store.last_commit()).await??;

    Ok(Json(StatusBody {
        head: last.as_ref().map(|c| c.oid.to_string()),
        last_commit: last.map(|c| LastCommit {
            summary: c.summary,
            time: c.time,
        }),
        sync: state.sync.status(),
    }))
}

/// Serve `app` until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
