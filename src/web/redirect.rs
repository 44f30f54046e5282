use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::SessionContext;
use crate::resolver::{self, ResolveFailure, ResolveState};
use crate::AppState;

use super::components::layout;

/// Follow a short link: `/{org_slug}/{slug}` → 307 to the destination
pub async fn resolve(
    State(state): State<AppState>,
    session: SessionContext,
    Path((org_slug, slug)): Path<(String, String)>,
) -> Response {
    let retry = format!(
        "/{}/{}",
        urlencoding::encode(&org_slug),
        urlencoding::encode(&slug)
    );

    match resolver::resolve(&state.client, session.token(), &org_slug, &slug).await {
        ResolveState::Navigating(destination) => {
            tracing::debug!("Short link {} → {}", retry, destination);
            Redirect::temporary(&destination).into_response()
        }
        ResolveState::Failed(ResolveFailure::UnknownLink) => failure_page(
            StatusCode::NOT_FOUND,
            "This short link does not exist",
            &retry,
        ),
        ResolveState::Failed(ResolveFailure::InvalidDestination(destination)) => {
            tracing::warn!("Short link {} points at unsupported URL {:?}", retry, destination);
            failure_page(
                StatusCode::BAD_GATEWAY,
                "This short link points to an address that cannot be opened.",
                &retry,
            )
        }
        ResolveState::Failed(ResolveFailure::Upstream(e)) => {
            tracing::warn!(error = %e, "Could not resolve short link {}", retry);
            failure_page(
                StatusCode::BAD_GATEWAY,
                "We could not open this short link right now.",
                &retry,
            )
        }
        ResolveState::Pending => failure_page(
            StatusCode::BAD_GATEWAY,
            "We could not open this short link right now.",
            &retry,
        ),
    }
}

fn failure_page(status: StatusCode, message: &str, retry: &str) -> Response {
    (
        status,
        layout::message_page("Link unavailable", message, "error", (retry, "Try again")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_utils::helpers::{body_string, location, test_app, StubApi};
    use axum::{
        body::Body,
        extract::Query,
        http::{HeaderMap, Request, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn visit(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn resolving_api() -> Router {
        Router::new().route(
            "/api/urls/resolve/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                match (params["organization_slug"].as_str(), params["slug"].as_str()) {
                    ("acme", "promo") => Ok(Json(json!({"original_url": "https://example.com/x"}))),
                    ("acme", "docs") => Ok(Json(json!({"original_url": "https://example.com/docs"}))),
                    _ => Err(StatusCode::NOT_FOUND),
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_known_slug_redirects_with_one_call() {
        let stub = StubApi::spawn(resolving_api()).await;

        let response = test_app(&stub).oneshot(visit("/acme/promo")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "https://example.com/x");
        assert_eq!(
            stub.hits(),
            vec!["GET /api/urls/resolve/?organization_slug=acme&slug=promo"]
        );
    }

    #[tokio::test]
    async fn test_unknown_slug_shows_error_with_retry() {
        let stub = StubApi::spawn(resolving_api()).await;

        let response = test_app(&stub).oneshot(visit("/acme/missing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("location").is_none());

        let body = body_string(response).await;
        assert!(body.contains("This short link does not exist"));
        assert!(body.contains(r#"href="/acme/missing""#));
        assert!(body.contains("Try again"));
    }

    #[tokio::test]
    async fn test_each_request_resolves_again() {
        let stub = StubApi::spawn(resolving_api()).await;
        let app = test_app(&stub);

        for uri in ["/acme/promo", "/acme/docs", "/acme/promo"] {
            let response = app.clone().oneshot(visit(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        }

        assert_eq!(stub.hit_count("/api/urls/resolve/"), 3);
        assert_eq!(
            stub.hits()[1],
            "GET /api/urls/resolve/?organization_slug=acme&slug=docs"
        );
    }

    #[tokio::test]
    async fn test_upstream_outage_is_bad_gateway() {
        let stub = StubApi::spawn(Router::new().route(
            "/api/urls/resolve/",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let response = test_app(&stub).oneshot(visit("/acme/promo")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_string(response).await.contains("Try again"));
    }

    #[tokio::test]
    async fn test_destination_with_line_break_is_bad_gateway() {
        let stub = StubApi::spawn(Router::new().route(
            "/api/urls/resolve/",
            get(|| async { Json(json!({"original_url": "https://example.com/a\nb"})) }),
        ))
        .await;

        let response = test_app(&stub).oneshot(visit("/acme/promo")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get("location").is_none());

        let body = body_string(response).await;
        assert!(body.contains("cannot be opened"));
        assert!(body.contains("Try again"));
    }

    #[tokio::test]
    async fn test_session_token_is_forwarded_when_present() {
        let stub = StubApi::spawn(Router::new().route(
            "/api/urls/resolve/",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({"original_url": format!("https://example.com/?auth={}", auth.len())}))
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(
                Request::builder()
                    .uri("/acme/promo")
                    .header("cookie", "access_token=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // "Bearer abc"
        assert_eq!(location(&response), "https://example.com/?auth=10");
    }
}
