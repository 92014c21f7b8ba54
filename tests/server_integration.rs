//! Integration tests for the HTTP layer.
//!
//! Requests are driven through the router in memory with
//! `tower::ServiceExt::oneshot`; the store behind it is real.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use common::{count_commits, TestRemote};
use wikiedit::server::{self, AppState};
use wikiedit::store::Store;
use wikiedit::sync::SyncScheduler;

const LONG: Duration = Duration::from_secs(3600);

struct Harness {
    remote: TestRemote,
    state: Arc<AppState>,
    _scheduler: SyncScheduler<Store>,
}

impl Harness {
    fn new(allow_anonymous: bool) -> Self {
        let remote = TestRemote::new();
        let store = Arc::new(remote.store("store"));
        // The scheduler is never run; requests just queue up.
        let (scheduler, sync) = SyncScheduler::new(Arc::clone(&store), LONG, LONG);

        let state = Arc::new(AppState {
            store,
            sync,
            redirect: "https://wiki.example.com/".to_string(),
            allow_anonymous,
        });
        Self {
            remote,
            state,
            _scheduler: scheduler,
        }
    }

    fn app(&self) -> Router {
        server::router(Arc::clone(&self.state), None)
    }

    fn app_with_assets(&self, dir: &Path) -> Router {
        server::router(Arc::clone(&self.state), Some(dir))
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, email: &str) -> Request<Body> {
    Request::get(uri)
        .header(server::IDENTITY_HEADER, email)
        .body(Body::empty())
        .unwrap()
}

fn post_as(uri: &str, email: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(server::IDENTITY_HEADER, email)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn ready_returns_ok() {
    let harness = Harness::new(false);
    let response = harness.app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn root_redirects_temporarily() {
    let harness = Harness::new(false);
    let response = harness.app().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://wiki.example.com/"
    );
}

#[tokio::test]
async fn edit_requires_identity() {
    let harness = Harness::new(false);
    let response = harness.app().oneshot(get("/edit/foo/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "unauthenticated!");
}

#[tokio::test]
async fn anonymous_allowed_when_enabled() {
    let harness = Harness::new(true);
    let response = harness.app().oneshot(get("/edit/foo/test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn edit_page_renders_editor() {
    let harness = Harness::new(false);
    let response = harness
        .app()
        .oneshot(get_as("/edit/foo/test", "user@test.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<h1 id=\"hello\">hello</h1>"));
    assert!(html.contains("/assets/quill.js"));
    assert!(!html.contains("Update was successful"));
}

#[tokio::test]
async fn missing_page_is_not_found() {
    let harness = Harness::new(false);
    let response = harness
        .app()
        .oneshot(get_as("/edit/foo/bar", "user@test.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "The requested page was not found");
}

#[tokio::test]
async fn traversal_is_not_found() {
    let harness = Harness::new(false);
    let response = harness
        .app()
        .oneshot(get_as("/edit/foo/%2E%2E/%2E%2E/secret", "user@test.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_saves_and_requests_sync() {
    let harness = Harness::new(false);
    let work_dir = harness.remote.store_dir("store");
    let before = count_commits(&work_dir);

    let form = "content=%3Ch1%3Ehello+again%3C%2Fh1%3E%3Cp%3E%3Cstrong%3Eworld%3C%2Fstrong%3E%3C%2Fp%3E";
    let response = harness
        .app()
        .oneshot(post_as("/edit/foo/test", "user@test.com", form))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Update was successful"));
    assert!(html.contains("<h1 id=\"hello-again\">hello again</h1>"));

    assert_eq!(count_commits(&work_dir), before + 1);
    assert_eq!(
        std::fs::read_to_string(work_dir.join("content/foo/test.md")).unwrap(),
        "# hello again\n\n**world**"
    );
}

#[tokio::test]
async fn post_to_missing_page_creates_nothing() {
    let harness = Harness::new(false);
    let work_dir = harness.remote.store_dir("store");
    let before = count_commits(&work_dir);

    let response = harness
        .app()
        .oneshot(post_as("/edit/foo/bar", "user@test.com", "content=%3Cp%3Ex%3C%2Fp%3E"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(count_commits(&work_dir), before);
    assert!(!work_dir.join("content/foo/bar.md").exists());
}

#[tokio::test]
async fn post_without_identity_is_rejected() {
    let harness = Harness::new(false);
    let request = Request::post("/edit/foo/test")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("content=%3Cp%3Ex%3C%2Fp%3E"))
        .unwrap();

    let response = harness.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_reports_head() {
    let harness = Harness::new(false);
    let response = harness
        .app()
        .oneshot(get_as("/status", "user@test.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let head = common::git_stdout(&harness.remote.store_dir("store"), &["rev-parse", "HEAD"]);
    assert_eq!(body["head"], head.trim());
    assert_eq!(body["last_commit"]["summary"], "initial commit");
    assert_eq!(body["sync"]["state"], "idle");
    assert_eq!(body["sync"]["runs"], 0);
}

#[tokio::test]
async fn status_requires_identity() {
    let harness = Harness::new(false);
    let response = harness.app().oneshot(get("/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "unauthenticated!");
}

#[tokio::test]
async fn status_hides_sync_error_text() {
    let remote = TestRemote::new();
    let store = Arc::new(remote.store("store"));
    let (scheduler, sync) = SyncScheduler::new(Arc::clone(&store), LONG, Duration::ZERO);
    tokio::spawn(scheduler.run());

    // Every pull now fails with git naming the missing remote path.
    let remote_path = remote.url().to_str().unwrap().to_string();
    std::fs::remove_dir_all(remote.url()).unwrap();

    let mut updates = sync.subscribe();
    sync.request();
    tokio::time::timeout(Duration::from_secs(30), updates.wait_for(|s| s.runs >= 1))
        .await
        .expect("timed out waiting for sync")
        .unwrap();
    assert!(sync.status().last_error.unwrap().contains("remote.git"));

    let state = Arc::new(AppState {
        store,
        sync,
        redirect: "/".to_string(),
        allow_anonymous: false,
    });
    let response = server::router(state, None)
        .oneshot(get_as("/status", "user@test.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(!text.contains(&remote_path), "status leaked {text}");
    assert!(!text.contains("remote.git"));
    assert!(!text.contains("fatal"));

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(body["sync"]["last_failure"].is_string());
    assert!(body["sync"].get("last_error").is_none());
    assert_eq!(body["sync"]["runs"], 1);
}

#[tokio::test]
async fn assets_are_served_when_configured() {
    let harness = Harness::new(false);
    let assets = tempfile::TempDir::new().unwrap();
    std::fs::write(assets.path().join("quill.js"), "// quill").unwrap();

    let response = harness
        .app_with_assets(assets.path())
        .oneshot(get("/assets/quill.js"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "// quill");

    let response = harness.app().oneshot(get("/assets/quill.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
