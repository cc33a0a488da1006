//! End-to-end tests for the profile page routing protocol.
//! Spins up the server on a random port with a SQLite store in a temp dir and
//! a static-token identity provider, then drives it over HTTP with redirects
//! disabled so every routing decision is visible.

use marketd::{
    config::AppConfig, forms::BasicFormRenderer, identity::StaticTokens, routing::Role,
    storage::Storage, web, AppContext,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

const TOKEN_U1: &str = "tok-u1";

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Build a minimal AppContext and start the server on a random port.
async fn start_test_server(dir: &TempDir) -> (String, Arc<AppContext>) {
    let port = find_free_port();
    let config = Arc::new(AppConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        Some("127.0.0.1".to_string()),
    ));
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let identity = Arc::new(StaticTokens::new(HashMap::from([(
        TOKEN_U1.to_string(),
        "u1".to_string(),
    )])));

    let ctx = Arc::new(AppContext {
        config,
        storage,
        identity,
        forms: Arc::new(BasicFormRenderer),
        started_at: std::time::Instant::now(),
    });

    tokio::spawn(web::start_server(ctx.clone()));

    let base = format!("http://127.0.0.1:{port}");
    // Wait for the listener to come up.
    let probe = reqwest::Client::new();
    for _ in 0..100 {
        if probe.get(format!("{base}/healthz")).send().await.is_ok() {
            return (base, ctx);
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("server did not start");
}

/// Client that surfaces redirects instead of following them.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn unauthenticated_visitor_is_redirected_to_login_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;
    let client = client();

    for path in [
        "/client/profile/new",
        "/client/profile/edit",
        "/provider/profile/new",
        "/provider/profile/edit",
    ] {
        let resp = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), 303, "{path}");
        assert_eq!(location(&resp), "/login", "{path}");
    }
}

#[tokio::test]
async fn invalid_token_counts_as_unauthenticated() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;

    let resp = client()
        .get(format!("{base}/client/profile/edit"))
        .bearer_auth("no-such-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn new_page_without_profile_renders_empty_form() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;

    let resp = client()
        .get(format!("{base}/provider/profile/new"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Create your provider profile"));
}

#[tokio::test]
async fn new_page_with_existing_profile_redirects_to_edit() {
    let dir = tempfile::tempdir().unwrap();
    let (base, ctx) = start_test_server(&dir).await;
    ctx.storage
        .upsert_profile(Role::Provider, "u1", "Pat", "x")
        .await
        .unwrap();

    let resp = client()
        .get(format!("{base}/provider/profile/new"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/provider/profile/edit");
}

#[tokio::test]
async fn edit_page_with_existing_profile_renders_the_stored_record() {
    let dir = tempfile::tempdir().unwrap();
    let (base, ctx) = start_test_server(&dir).await;
    ctx.storage
        .upsert_profile(Role::Provider, "u1", "Pat", "fixes boilers")
        .await
        .unwrap();

    let resp = client()
        .get(format!("{base}/provider/profile/edit"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Edit your provider profile"));
    assert!(body.contains("fixes boilers"));
}

#[tokio::test]
async fn edit_page_without_profile_redirects_to_new() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;

    let resp = client()
        .get(format!("{base}/client/profile/edit"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/client/profile/new");
}

#[tokio::test]
async fn roles_do_not_share_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let (base, ctx) = start_test_server(&dir).await;
    ctx.storage
        .upsert_profile(Role::Client, "u1", "Pat", "client only")
        .await
        .unwrap();

    // Provider side still has nothing for u1.
    let resp = client()
        .get(format!("{base}/provider/profile/edit"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/provider/profile/new");
}

#[tokio::test]
async fn submit_persists_and_subsequent_pages_see_the_profile() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;
    let client = client();

    let resp = client
        .post(format!("{base}/client/profile"))
        .bearer_auth(TOKEN_U1)
        .form(&[("display_name", "Pat"), ("bio", "looking for a plumber")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/client/profile/edit");

    // The new page now bounces to edit, and edit shows the saved record.
    let resp = client
        .get(format!("{base}/client/profile/new"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/client/profile/edit");

    let resp = client
        .get(format!("{base}/client/profile/edit"))
        .bearer_auth(TOKEN_U1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("looking for a plumber"));
}

#[tokio::test]
async fn unauthenticated_submit_redirects_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;

    let resp = client()
        .post(format!("{base}/provider/profile"))
        .form(&[("display_name", "Pat")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _ctx) = start_test_server(&dir).await;

    let resp = client().get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
