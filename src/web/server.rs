//! Router assembly and the listener loop.

use axum::{
    Router, middleware,
    http::{Method, header},
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth;
use super::handlers::{comments, issues, meta, search};
use super::state::AppState;
use crate::config::ServerConfig;

fn cors_layer(permissive: bool) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::LINK, header::LOCATION]);
    if permissive {
        cors.allow_origin(Any)
    } else {
        cors
    }
}

/// Build the router with every API route.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let api = Router::new()
        .route("/api/health", get(meta::health))
        .route("/api/auth/status", get(meta::auth_status))
        .route("/api/auth/verify", post(meta::auth_verify));

    let repo = Router::new()
        .route(
            "/repos/{owner}/{repo}/issues",
            get(issues::list_repo_issues).post(issues::create_issue),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{number}",
            get(issues::get_issue).patch(issues::update_issue),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{number}/lock",
            put(issues::lock_issue).delete(issues::unlock_issue),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{number}/events",
            get(issues::list_events),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{number}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/repos/{owner}/{repo}/issues/comments",
            get(comments::list_repo_comments),
        )
        .route(
            "/repos/{owner}/{repo}/issues/comments/{comment_id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/repos/{owner}/{repo}/issues/comments/{comment_id}/pin",
            put(comments::pin_comment).delete(comments::unpin_comment),
        )
        .route("/repos/{owner}/{repo}/labels", get(issues::list_labels));

    let cross_repo = Router::new()
        .route("/issues", get(issues::list_all_issues))
        .route("/user/issues", get(issues::list_all_issues))
        .route("/orgs/{org}/issues", get(issues::list_org_issues))
        .route("/search/issues", get(search::search_issues));

    Router::new()
        .merge(api)
        .merge(repo)
        .merge(cross_repo)
        .fallback(meta::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ))
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Bind the listener for `config`.
///
/// The host may be an IP address (IPv6 with or without brackets) or a
/// hostname such as `localhost`, which is resolved.
///
/// # Errors
///
/// Returns an error if the host does not resolve or the port cannot be bound.
pub async fn bind_listener(config: &ServerConfig) -> std::io::Result<TcpListener> {
    let host = config.host.trim_start_matches('[').trim_end_matches(']');
    TcpListener::bind((host, config.port)).await
}

/// Run the HTTP server until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(state: AppState, config: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(state, config.cors_permissive);

    let listener = bind_listener(config).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::auth::AuthGate;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use issues_core::IssueTracker;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app_with(auth: AuthGate) -> Router {
        crate::logging::init_test_logging();
        let state = AppState::new(IssueTracker::in_memory("local-user"), auth, None);
        build_router(state, false)
    }

    fn app() -> Router {
        app_with(AuthGate::disabled())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = send(&app(), get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_returns_201_with_location() {
        let app = app();
        let response = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/repos/acme/widget/issues",
                &json!({"title": "Bug", "body": "crash on load"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost/repos/acme/widget/issues/1"
        );
    }

    #[tokio::test]
    async fn test_unknown_issue_is_github_404() {
        let (status, body) = send(&app(), get_req("/repos/acme/widget/issues/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not Found");
        assert_eq!(body["documentation_url"], "https://docs.github.com/rest");

        let (status, _) = send(&app(), get_req("/repos/acme/widget/issues/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app(), get_req("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_title_is_422() {
        let (status, body) = send(
            &app(),
            json_req("POST", "/repos/acme/widget/issues", &json!({"title": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Validation Failed");
        assert_eq!(body["errors"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/repos/acme/widget/issues")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Problems parsing JSON");
    }

    #[tokio::test]
    async fn test_bad_query_value_is_422() {
        let (status, body) = send(&app(), get_req("/repos/acme/widget/issues?state=merged")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "state");
    }

    #[tokio::test]
    async fn test_unknown_repo_lists_empty() {
        let (status, body) = send(&app(), get_req("/repos/nobody/nothing/issues")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_auth_gate() {
        let app = app_with(AuthGate::with_token("s3cret"));

        let (status, body) = send(&app, get_req("/api/auth/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["required"], true);

        let (status, body) = send(&app, get_req("/issues")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Requires authentication");

        let request = Request::builder()
            .uri("/issues")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/issues")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::OK);

        let (_, body) = send(
            &app,
            json_req("POST", "/api/auth/verify", &json!({"token": "s3cret"})),
        )
        .await;
        assert_eq!(body["valid"], true);
        let (_, body) = send(
            &app,
            json_req("POST", "/api/auth/verify", &json!({"token": "nope"})),
        )
        .await;
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn test_verify_without_gate_is_always_valid() {
        let (status, body) = send(
            &app(),
            json_req("POST", "/api/auth/verify", &json!({"token": "whatever"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(send(&app(), get_req("/api/auth/status")).await.1["required"], false);
    }

    #[tokio::test]
    async fn test_binds_hostnames_and_ip_literals() {
        for host in ["localhost", "127.0.0.1"] {
            let config = ServerConfig {
                host: host.to_string(),
                port: 0,
                cors_permissive: false,
            };
            let listener = bind_listener(&config).await.unwrap();
            assert!(listener.local_addr().unwrap().ip().is_loopback(), "{host}");
        }
    }
}
