//! RFC 9457 problem responses for access control outcomes.

use access_control_sdk::{AccessControlError, ErrorKind, PermissionVariant};
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;

/// Problem Details body (`application/problem+json`).
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Machine-readable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/problem+json"),
                )],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize problem response: {e}");
                status.into_response()
            }
        }
    }
}

/// Rejection for a denied decision.
#[must_use]
pub fn forbidden(variant: PermissionVariant, resource: &str) -> Problem {
    Problem::new(
        StatusCode::FORBIDDEN,
        "Forbidden",
        format!("'{variant}' is not granted on '{resource}'"),
    )
    .with_code("access_denied")
}

/// Convert an evaluation failure to a Problem response.
#[must_use]
pub fn access_error_to_problem(err: &AccessControlError) -> Problem {
    log_access_error(err);
    let kind = err.kind();
    let (status, title, detail) = match kind {
        ErrorKind::MissingPrincipal => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required".to_owned(),
        ),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not Found", err.to_string()),
        ErrorKind::PersistenceError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Ownership lookup failed".to_owned(),
        ),
        ErrorKind::InvalidAction | ErrorKind::InvalidOperands => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Access check is misconfigured".to_owned(),
        ),
    };
    Problem::new(status, title, detail).with_code(kind.as_str())
}

/// Log evaluation errors at appropriate levels.
fn log_access_error(err: &AccessControlError) {
    match err.kind() {
        ErrorKind::MissingPrincipal | ErrorKind::NotFound => {
            tracing::debug!("Access check rejected request: {err}");
        }
        ErrorKind::InvalidAction | ErrorKind::InvalidOperands => {
            tracing::error!("Access check misconfigured: {err}");
        }
        ErrorKind::PersistenceError => tracing::error!("Access check lookup failed: {err}"),
    }
}
