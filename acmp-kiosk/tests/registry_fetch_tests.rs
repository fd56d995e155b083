//! Member registry fetch-path tests
//!
//! Exercise the load envelope handling against an in-process HTTP fixture:
//! well-formed envelopes replace the member set, everything else falls back
//! to the demo dataset.

use std::sync::Arc;

use acmp_common::events::Severity;
use acmp_kiosk::registry::MemberRegistry;
use acmp_kiosk::Notifier;
use axum::{routing::get, Json, Router};
use serde_json::json;

struct NullNotifier;
impl Notifier for NullNotifier {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Serve a fixed JSON response on an ephemeral port, return the member URL
async fn serve_members(response: serde_json::Value) -> String {
    let app = Router::new().route(
        "/api/members",
        get(move || {
            let response = response.clone();
            async move { Json(response) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/members")
}

fn registry(url: String) -> MemberRegistry {
    MemberRegistry::new(url, Arc::new(NullNotifier)).unwrap()
}

#[tokio::test]
async fn test_load_success_replaces_member_set() {
    let url = serve_members(json!({
        "success": true,
        "data": [
            {
                "registrationNumber": "17",
                "firstName": "Awa",
                "lastName": "Diop",
                "occupation": "student",
                "studyOrWorkPlace": "Lycée Jean Moulin"
            },
            {
                "registrationNumber": "ACM18",
                "firstName": "Jean"
            },
            {
                // No registration number: unresolvable, dropped
                "firstName": "Fantôme"
            }
        ]
    }))
    .await;

    let reg = registry(url);
    let members = reg.load().await;

    assert_eq!(members.len(), 2);
    assert!(!reg.demo_mode().await);

    // Cleaning prefixed the bare number and filled defaults
    assert_eq!(members[0].registration_number, "ACM17");
    assert_eq!(members[1].registration_number, "ACM18");
    assert_eq!(members[1].last_name, "Non spécifié");

    let member = reg.resolve("m17").await.unwrap();
    assert_eq!(member.first_name, "Awa");
}

#[tokio::test]
async fn test_envelope_success_false_falls_back() {
    let url = serve_members(json!({
        "success": false,
        "message": "maintenance"
    }))
    .await;

    let reg = registry(url);
    let members = reg.load().await;

    assert_eq!(members.len(), 6);
    assert!(reg.demo_mode().await);
}

#[tokio::test]
async fn test_malformed_body_falls_back() {
    let app = Router::new().route("/api/members", get(|| async { "not json at all" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let reg = registry(format!("http://{addr}/api/members"));
    let members = reg.load().await;

    assert_eq!(members.len(), 6);
    assert!(reg.demo_mode().await);
}

#[tokio::test]
async fn test_http_error_status_falls_back() {
    let app = Router::new().route(
        "/api/members",
        get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let reg = registry(format!("http://{addr}/api/members"));
    reg.load().await;
    assert!(reg.demo_mode().await);
}

#[tokio::test]
async fn test_successful_reload_clears_demo_mode() {
    use std::sync::atomic::{AtomicBool, Ordering};

    // The fixture fails the first request and serves members afterwards
    let failed_once = Arc::new(AtomicBool::new(false));
    let app = Router::new().route(
        "/api/members",
        get(move || {
            let failed_once = Arc::clone(&failed_once);
            async move {
                if !failed_once.swap(true, Ordering::SeqCst) {
                    return Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
                }
                Ok(Json(json!({
                    "success": true,
                    "data": [{ "registrationNumber": "ACM01", "firstName": "Awa" }]
                })))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let reg = registry(format!("http://{addr}/api/members"));
    reg.load().await;
    assert!(reg.demo_mode().await);

    let members = reg.load().await;
    assert_eq!(members.len(), 1);
    assert!(!reg.demo_mode().await);
}
