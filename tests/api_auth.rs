mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::TestApi;
use gh_issues_local::web::AuthGate;
use gh_issues_local::web::auth::ensure_token;

fn authorized(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_token_file_gate() {
    let dir = tempfile::tempdir().unwrap();
    let token = ensure_token(dir.path()).unwrap();
    let api = TestApi::with_auth(AuthGate::with_token(token.clone()));

    for path in [
        "/issues",
        "/user/issues",
        "/orgs/acme/issues",
        "/search/issues?q=x",
        "/repos/acme/widget/issues",
    ] {
        let response = api.get(path).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(response.body["message"], "Requires authentication");
    }

    assert_eq!(api.get("/api/health").await.status, StatusCode::OK);
    assert_eq!(api.get("/api/auth/status").await.body["required"], true);

    let response = api.send(authorized("/issues", &token)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = api
        .send(
            Request::builder()
                .uri("/repos/acme/widget/issues")
                .header(header::AUTHORIZATION, format!("token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}
