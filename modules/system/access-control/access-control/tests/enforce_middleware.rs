#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the `enforce` middleware
//!
//! These tests verify that:
//! 1. Granted requests reach the handler with the `Decision` attached
//! 2. Denials and evaluation errors map to problem responses
//! 3. Operands are read from path, query, headers and JSON body
//! 4. A buffered body is forwarded to the handler unchanged

use std::sync::Arc;

use access_control::{AccessControl, AccessControlConfig, CheckState, enforce};
use access_control_sdk::{
    CheckSpec, Decision, LookupError, ModelLookup, OperandSpec, PointQuery, Principal, Record,
    RecordLookup, RuleEngine, Source,
};
use async_trait::async_trait;
use axum::{
    Extension, Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde_json::{Value, json};
use static_grants_plugin::{StaticGrantsPluginConfig, StaticGrantsService};
use tower::ServiceExt;

fn video_rules() -> Arc<dyn RuleEngine> {
    let config: StaticGrantsPluginConfig = serde_json::from_value(json!({
        "grants": [
            { "role": "admin", "resource": "video", "action": "read:any" },
            { "role": "admin", "resource": "video", "action": "create:any" },
            { "role": "user", "resource": "video", "action": "read:own" },
            { "role": "user", "resource": "video", "action": "create:own" }
        ]
    }))
    .unwrap();
    Arc::new(StaticGrantsService::from_config(&config).unwrap())
}

/// Test-only authentication: `x-role` and `x-user-id` headers become a `Principal`.
async fn attach_principal(mut req: Request, next: Next) -> Response {
    let role = req
        .headers()
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(role) = role {
        let mut builder = Principal::builder().role(role);
        if let Some(id) = id {
            builder = builder.id(id);
        }
        req.extensions_mut().insert(builder.build());
    }
    next.run(req).await
}

async fn variant_handler(Extension(decision): Extension<Decision>) -> String {
    decision.variant().to_string()
}

async fn echo_handler(body: String) -> String {
    body
}

fn router(access: AccessControl, spec: CheckSpec, cfg: &AccessControlConfig) -> Router {
    let state = CheckState::with_config(access, spec, cfg);
    Router::new()
        .route("/users/{userId}/videos", get(variant_handler))
        .route("/videos/{videoId}", get(variant_handler))
        .route("/videos", post(echo_handler))
        .route_layer(middleware::from_fn_with_state(state, enforce))
        .layer(middleware::from_fn(attach_principal))
}

fn user_videos_spec() -> CheckSpec {
    CheckSpec::new("video", "read").owned_by(
        OperandSpec::direct(Source::Principal, "id"),
        OperandSpec::direct(Source::Params, "userId"),
    )
}

fn request(method: Method, uri: &str, role: Option<&str>, user_id: Option<&str>) -> Request {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header("x-role", role);
    }
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn problem(response: Response) -> Value {
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Serves a fixed row, or fails, for every lookup.
enum FixedLookup {
    Row(Option<Value>),
    Failing,
}

#[async_trait]
impl RecordLookup for FixedLookup {
    async fn find_one(&self, _query: &PointQuery) -> Result<Option<Record>, LookupError> {
        match self {
            Self::Row(row) => Ok(row.as_ref().and_then(|r| r.as_object().cloned())),
            Self::Failing => Err(LookupError::Internal("connection refused".to_owned())),
        }
    }
}

fn video_by_param_spec() -> CheckSpec {
    CheckSpec::new("video", "read").owned_by(
        OperandSpec::direct(Source::Principal, "id"),
        OperandSpec::model(
            Source::Params,
            "videoId",
            ModelLookup::new("video", "id", "author_id").unwrap(),
        ),
    )
}

#[tokio::test]
async fn owner_reaches_handler_with_owned_decision() {
    let app = router(
        AccessControl::new(video_rules()),
        user_videos_spec(),
        &AccessControlConfig::default(),
    );

    let response = app
        .oneshot(request(Method::GET, "/users/7/videos", Some("user"), Some("7")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "readOwn");
}

#[tokio::test]
async fn non_owner_is_forbidden() {
    let app = router(
        AccessControl::new(video_rules()),
        user_videos_spec(),
        &AccessControlConfig::default(),
    );

    let response = app
        .oneshot(request(Method::GET, "/users/8/videos", Some("user"), Some("7")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = problem(response).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["code"], "access_denied");
    assert!(body["detail"].as_str().unwrap().contains("readAny"));
}

#[tokio::test]
async fn admin_reads_other_users_videos() {
    let app = router(
        AccessControl::new(video_rules()),
        user_videos_spec(),
        &AccessControlConfig::default(),
    );

    let response = app
        .oneshot(request(Method::GET, "/users/8/videos", Some("admin"), Some("1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "readAny");
}

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let app = router(
        AccessControl::new(video_rules()),
        user_videos_spec(),
        &AccessControlConfig::default(),
    );

    let response = app
        .oneshot(request(Method::GET, "/users/7/videos", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(problem(response).await["code"], "missing_principal");
}

#[tokio::test]
async fn invalid_action_is_a_server_error() {
    let app = router(
        AccessControl::new(video_rules()),
        CheckSpec::new("video", "invalid-action"),
        &AccessControlConfig::default(),
    );

    let response = app
        .oneshot(request(Method::GET, "/videos/1", Some("admin"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem(response).await["code"], "invalid_action");
}

#[tokio::test]
async fn model_lookup_without_row_is_not_found() {
    let access =
        AccessControl::new(video_rules()).with_lookup(Arc::new(FixedLookup::Row(None)));
    let app = router(access, video_by_param_spec(), &AccessControlConfig::default());

    let response = app
        .oneshot(request(Method::GET, "/videos/404", Some("user"), Some("1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(problem(response).await["code"], "not_found");
}

#[tokio::test]
async fn model_lookup_match_is_granted() {
    let row = json!({ "id": 1, "author_id": 1 });
    let access =
        AccessControl::new(video_rules()).with_lookup(Arc::new(FixedLookup::Row(Some(row))));
    let app = router(access, video_by_param_spec(), &AccessControlConfig::default());

    let response = app
        .oneshot(request(Method::GET, "/videos/1", Some("user"), Some("1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "readOwn");
}

#[tokio::test]
async fn lookup_failure_is_a_server_error() {
    let access = AccessControl::new(video_rules()).with_lookup(Arc::new(FixedLookup::Failing));
    let app = router(access, video_by_param_spec(), &AccessControlConfig::default());

    let response = app
        .oneshot(request(Method::GET, "/videos/1", Some("user"), Some("1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = problem(response).await;
    assert_eq!(body["code"], "persistence_error");
    assert!(!body["detail"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn query_and_header_operands_are_compared() {
    let spec = CheckSpec::new("video", "read").owned_by(
        OperandSpec::direct(Source::Headers, "X-Owner"),
        OperandSpec::direct(Source::Query, "owner"),
    );
    let app = router(AccessControl::new(video_rules()), spec, &AccessControlConfig::default());

    let mut req = request(Method::GET, "/videos/1?owner=42", Some("user"), None);
    req.headers_mut().insert("x-owner", "42".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "readOwn");
}

fn create_for_author_spec() -> CheckSpec {
    CheckSpec::new("video", "create").owned_by(
        OperandSpec::direct(Source::Principal, "id"),
        OperandSpec::direct(Source::Body, "authorId"),
    )
}

fn json_post(body: &str, role: &str, user_id: &str) -> Request {
    axum::http::Request::builder()
        .method(Method::POST)
        .uri("/videos")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-role", role)
        .header("x-user-id", user_id)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn body_operand_is_read_and_body_is_forwarded() {
    let app = router(
        AccessControl::new(video_rules()),
        create_for_author_spec(),
        &AccessControlConfig::default(),
    );
    let payload = r#"{"authorId":7,"title":"cats"}"#;

    let response = app.oneshot(json_post(payload, "user", "7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, payload);
}

#[tokio::test]
async fn non_json_body_reads_as_empty() {
    let app = router(
        AccessControl::new(video_rules()),
        create_for_author_spec(),
        &AccessControlConfig::default(),
    );

    let response = app.oneshot(json_post("authorId=7", "user", "7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(problem(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("createAny"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let cfg: AccessControlConfig =
        serde_json::from_value(json!({ "body_limit_bytes": 8 })).unwrap();
    let app = router(AccessControl::new(video_rules()), create_for_author_spec(), &cfg);

    let response = app
        .oneshot(json_post(r#"{"authorId":7,"title":"cats"}"#, "user", "7"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
