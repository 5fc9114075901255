use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod integration;
pub mod library;
pub mod message;
pub mod proposal;
mod schema;
pub mod state;
pub mod thread;
pub mod unread;
pub mod user;

#[cfg(test)]
mod testing;

pub type Result<T> = std::result::Result<T, error::Error>;

/// Assembles the HTTP surface. Everything except `/health` requires a
/// verified bearer token.
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    let protected = Router::new()
        .merge(thread::api(state.clone()))
        .merge(proposal::api(state.clone()))
        .merge(message::api(state.clone()))
        .merge(unread::api(state.clone()))
        .merge(conversation::api(state.clone()))
        .route_layer(from_fn_with_state(
            state,
            auth::middleware::authorize,
        ));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

#[cfg(test)]
mod test {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::testing::Harness;

    use super::*;

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(name) = user {
            req = req.header(header::AUTHORIZATION, format!("Bearer token-{name}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn should_serve_health_without_token() {
        let h = Harness::new();
        let app = app(h.state.clone(), CorsLayer::new());

        let (status, _) = call(&app, "GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_require_valid_token() {
        let h = Harness::new();
        let app = app(h.state.clone(), CorsLayer::new());
        let uri = format!("/users/{}/conversations", user::Id::random());

        let (missing, body) = call(&app, "GET", &uri, None, None).await;
        let (unknown, _) = call(&app, "GET", &uri, Some("mallory"), None).await;

        assert_eq!(missing, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "unauthorized");
        assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn should_negotiate_over_http() {
        let h = Harness::new();
        let (a, b) = (h.user("alice"), h.user("bob"));
        h.library.put("T1", b, "Dune");
        h.library.put("42", b, "Emma");
        let app = app(h.state.clone(), CorsLayer::new());

        let (status, proposed) = call(
            &app,
            "POST",
            "/threads/propose",
            Some("alice"),
            Some(json!({
                "responder_id": b,
                "target_book_id": "T1",
                "target_book_title": "Dune",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(proposed["proposal"]["status"], "pending");
        let pid = proposed["proposal"]["id"].as_i64().unwrap();
        let tid = proposed["thread"]["id"].as_str().unwrap().to_string();

        let (status, unread) =
            call(&app, "GET", &format!("/threads/{tid}/unread"), Some("bob"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unread["unread_count"], 1);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/proposals/{pid}/respond"),
            Some("bob"),
            Some(json!({ "action": "accept" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("selecting"));

        let (status, outcome) = call(
            &app,
            "POST",
            &format!("/proposals/{pid}/respond"),
            Some("bob"),
            Some(json!({ "action": "accept", "selected_book_id": "42" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["proposal"]["status"], "accepted");
        assert_eq!(outcome["exchange"]["offered_book_id"], "42");

        let (status, _) = call(
            &app,
            "POST",
            &format!("/proposals/{pid}/respond"),
            Some("bob"),
            Some(json!({ "action": "reject" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, messages) = call(
            &app,
            "GET",
            &format!("/threads/{tid}/messages?since={pid}"),
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(messages[0]["kind"], "system");

        let (status, list) = call(
            &app,
            "GET",
            &format!("/users/{a}/conversations"),
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["counterpart_name"], "bob");
    }

    #[tokio::test]
    async fn should_map_domain_errors() {
        let h = Harness::new();
        let (_, b) = (h.user("alice"), h.user("bob"));
        let app = app(h.state.clone(), CorsLayer::new());

        let (status, _) = call(
            &app,
            "GET",
            &format!("/users/{b}/conversations"),
            Some("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/threads/{}/messages", thread::Id::random()),
            Some("alice"),
            Some(json!({ "body": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().starts_with("thread not found"));

        let (status, _) = call(&app, "GET", "/proposals/12345", Some("alice"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_answer_unavailable_when_library_is_down() {
        let h = Harness::new();
        let (_, b) = (h.user("alice"), h.user("bob"));
        h.library.put("T1", b, "Dune");
        h.library.put("42", b, "Emma");
        let app = app(h.state.clone(), CorsLayer::new());

        let (_, proposed) = call(
            &app,
            "POST",
            "/threads/propose",
            Some("alice"),
            Some(json!({
                "responder_id": b,
                "target_book_id": "T1",
                "target_book_title": "Dune",
            })),
        )
        .await;
        let pid = proposed["proposal"]["id"].as_i64().unwrap();

        h.library.set_down(true);
        let (status, body) = call(
            &app,
            "POST",
            &format!("/proposals/{pid}/respond"),
            Some("bob"),
            Some(json!({ "action": "accept", "selected_book_id": "42" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["message"].is_string());
        assert_eq!(h.status(&message::Id(pid)), proposal::Status::Pending);
        assert_eq!(h.ledger.calls(), 0);
    }
}
