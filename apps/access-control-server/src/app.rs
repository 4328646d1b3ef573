//! Demo video routes guarded by `enforce`.

use std::sync::Arc;

use access_control::{AccessControl, CheckState, Problem, SeaOrmRecordLookup, enforce};
use access_control_sdk::{
    Action, CheckSpec, ModelLookup, OperandSpec, PermissionVariant, Possession, Principal,
    RuleEngine, Source,
};
use anyhow::Context;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{MethodRouter, delete, get, post};
use axum::{Json, Router};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, FromQueryResult,
    Statement,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use static_grants_plugin::{GrantConfig, StaticGrantsPluginConfig, StaticGrantsService};
use tracing::{debug, info};

use crate::config::ServerConfig;

const VIDEO: &str = "video";

/// Grants used when the configuration names none: admins act on any video,
/// users only on their own.
#[must_use]
pub fn demo_grants() -> StaticGrantsPluginConfig {
    let mut grants = Vec::new();
    for action in Action::ALL {
        grants.push(GrantConfig {
            role: "admin".to_owned(),
            resource: VIDEO.to_owned(),
            action: PermissionVariant::new(action, Possession::Any),
        });
        grants.push(GrantConfig {
            role: "user".to_owned(),
            resource: VIDEO.to_owned(),
            action: PermissionVariant::new(action, Possession::Own),
        });
    }
    StaticGrantsPluginConfig {
        grants,
        extends: std::collections::HashMap::new(),
    }
}

/// Open the database; in-memory `SQLite` is pinned to one connection.
///
/// # Errors
///
/// Returns an error if the connection or seeding fails.
pub async fn connect(cfg: &ServerConfig) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(cfg.database_url.clone());
    if cfg.database_url.contains(":memory:") {
        opts.max_connections(1);
    }
    opts.sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to {}", cfg.database_url))?;

    if cfg.seed_demo_data {
        seed(&db).await.context("failed to seed demo data")?;
    }
    Ok(db)
}

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(
        "CREATE TABLE IF NOT EXISTS video (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author_id INTEGER NOT NULL
        )",
    )
    .await?;
    db.execute_unprepared(
        "INSERT OR IGNORE INTO video (id, title, author_id) VALUES
            (1, 'first video', 1),
            (2, 'second video', 2)",
    )
    .await?;
    info!("Seeded demo video table");
    Ok(())
}

/// Build the router with every check point validated up front.
///
/// # Errors
///
/// Returns an error if the grants or any check point are misconfigured.
pub fn build_router(cfg: &ServerConfig, db: DatabaseConnection) -> anyhow::Result<Router> {
    let grants = if cfg.grants.grants.is_empty() {
        StaticGrantsPluginConfig {
            extends: cfg.grants.extends.clone(),
            ..demo_grants()
        }
    } else {
        cfg.grants.clone()
    };
    let rules: Arc<dyn RuleEngine> = Arc::new(
        StaticGrantsService::from_config(&grants).context("invalid grants configuration")?,
    );
    let access = AccessControl::new(rules)
        .with_lookup(Arc::new(SeaOrmRecordLookup::new(db.clone())));

    let guard = |spec: CheckSpec, route: MethodRouter<DatabaseConnection>| {
        spec.validate()
            .with_context(|| format!("invalid check point for {} {}", spec.resource, spec.action))?;
        let state = CheckState::with_config(access.clone(), spec, &cfg.access_control);
        Ok::<_, anyhow::Error>(route.route_layer(middleware::from_fn_with_state(state, enforce)))
    };

    let video_owner = || {
        ModelLookup::new(VIDEO, "id", "author_id").map(|lookup| {
            OperandSpec::model(Source::Params, "videoId", lookup)
        })
    };
    let principal_id = || OperandSpec::direct(Source::Principal, "id");

    let video_routes = guard(
        CheckSpec::new(VIDEO, "read").owned_by(principal_id(), video_owner()?),
        get(get_video),
    )?
    .merge(guard(
        CheckSpec::new(VIDEO, "delete").owned_by(principal_id(), video_owner()?),
        delete(delete_video),
    )?);

    let router = Router::new()
        .route("/videos/{videoId}", video_routes)
        .route(
            "/videos",
            guard(
                CheckSpec::new(VIDEO, "create").owned_by(
                    principal_id(),
                    OperandSpec::direct(Source::Body, "authorId"),
                ),
                post(create_video),
            )?,
        )
        .route(
            "/users/{userId}/videos",
            guard(
                CheckSpec::new(VIDEO, "read").owned_by(
                    principal_id(),
                    OperandSpec::direct(Source::Params, "userId"),
                ),
                get(list_user_videos),
            )?,
        )
        .layer(middleware::from_fn(dev_principal))
        .with_state(db);

    Ok(router)
}

/// Development authentication: trusts `x-role` and `x-user-id` headers.
async fn dev_principal(mut req: Request, next: Next) -> Response {
    if let Some(principal) = principal_from_headers(req.headers()) {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let mut builder = Principal::builder().role(header("x-role")?);
    if let Some(id) = header("x-user-id") {
        builder = match id.parse::<i64>() {
            Ok(numeric) => builder.id(numeric),
            Err(_) => builder.id(id),
        };
    }
    Some(builder.build())
}

fn db_problem(err: &DbErr) -> Problem {
    tracing::error!("Video query failed: {err}");
    Problem::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "Database error",
    )
}

fn video_not_found(id: i64) -> Problem {
    Problem::new(
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("Video {id} not found"),
    )
}

async fn get_video(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i64>,
) -> Result<Json<JsonValue>, Problem> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT id, title, author_id FROM video WHERE id = ?",
        [id.into()],
    );
    JsonValue::find_by_statement(stmt)
        .one(&db)
        .await
        .map_err(|e| db_problem(&e))?
        .map(Json)
        .ok_or_else(|| video_not_found(id))
}

async fn delete_video(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Problem> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "DELETE FROM video WHERE id = ?",
        [id.into()],
    );
    let result = db.execute(stmt).await.map_err(|e| db_problem(&e))?;
    if result.rows_affected() == 0 {
        return Err(video_not_found(id));
    }
    debug!(id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewVideo {
    title: String,
    author_id: i64,
}

async fn create_video(
    State(db): State<DatabaseConnection>,
    Json(video): Json<NewVideo>,
) -> Result<(StatusCode, Json<JsonValue>), Problem> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO video (title, author_id) VALUES (?, ?)",
        [video.title.clone().into(), video.author_id.into()],
    );
    let result = db.execute(stmt).await.map_err(|e| db_problem(&e))?;
    let id = result.last_insert_id();
    debug!(id, author_id = video.author_id, "Video created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "title": video.title,
            "author_id": video.author_id,
        })),
    ))
}

async fn list_user_videos(
    State(db): State<DatabaseConnection>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<JsonValue>>, Problem> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT id, title, author_id FROM video WHERE author_id = ? ORDER BY id",
        [user_id.into()],
    );
    JsonValue::find_by_statement(stmt)
        .all(&db)
        .await
        .map(Json)
        .map_err(|e| db_problem(&e))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, header};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        let cfg = ServerConfig::default();
        let db = connect(&cfg).await.unwrap();
        build_router(&cfg, db).unwrap()
    }

    fn request(method: Method, uri: &str, role: &str, user_id: &str, body: Option<JsonValue>) -> Request {
        let builder = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("x-role", role)
            .header("x-user-id", user_id);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> JsonValue {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn author_reads_own_video() {
        let response = app()
            .await
            .oneshot(request(Method::GET, "/videos/1", "user", "1", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "first video");
    }

    #[tokio::test]
    async fn user_cannot_read_someone_elses_video() {
        let response = app()
            .await
            .oneshot(request(Method::GET, "/videos/2", "user", "1", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_reads_any_video() {
        let response = app()
            .await
            .oneshot(request(Method::GET, "/videos/2", "admin", "99", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_video_is_not_found() {
        let response = app()
            .await
            .oneshot(request(Method::GET, "/videos/404", "admin", "99", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn author_deletes_own_video() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/videos/2", "user", "1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(Method::DELETE, "/videos/2", "user", "2", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn users_create_videos_only_for_themselves() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/videos",
                "user",
                "1",
                Some(json!({ "title": "forged", "authorId": 2 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(
                Method::POST,
                "/videos",
                "user",
                "1",
                Some(json!({ "title": "mine", "authorId": 1 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["author_id"], 1);
    }

    #[tokio::test]
    async fn listing_is_limited_to_own_videos_for_users() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/users/1/videos", "user", "1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = app
            .oneshot(request(Method::GET, "/users/2/videos", "user", "1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn requests_without_principal_are_unauthorized() {
        let response = app()
            .await
            .oneshot(
                axum::http::Request::builder()
                    .uri("/videos/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn configured_extends_apply_to_demo_grants() {
        let mut cfg = ServerConfig::default();
        cfg.grants.extends.insert("moderator".to_owned(), vec!["user".to_owned()]);
        let db = connect(&cfg).await.unwrap();
        let app = build_router(&cfg, db).unwrap();

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/videos/1", "moderator", "1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(Method::GET, "/videos/2", "moderator", "1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn headers_build_principal_with_numeric_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-role", "user".parse().unwrap());
        headers.insert("x-user-id", "7".parse().unwrap());

        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.role(), "user");
        assert_eq!(principal.field("id"), Some(json!(7)));
    }

    #[test]
    fn headers_without_role_build_no_principal() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "7".parse().unwrap());

        assert_eq!(principal_from_headers(&headers), None);
    }

    #[test]
    fn demo_grants_cover_every_action() {
        assert_eq!(demo_grants().grants.len(), Action::ALL.len() * 2);
    }
}
