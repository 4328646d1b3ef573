//! Axum binding: evaluate one [`CheckSpec`] per request before the handler runs.

use std::collections::HashMap;
use std::sync::Arc;

use access_control_sdk::{CheckSpec, Decision, Principal, RequestData, Source};
use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::{StatusCode, header};

use super::error::{Problem, access_error_to_problem, forbidden};
use crate::config::AccessControlConfig;
use crate::domain::service::AccessControl;

/// Shared state for the [`enforce`] middleware; one per guarded route.
#[derive(Clone)]
pub struct CheckState {
    access: AccessControl,
    spec: Arc<CheckSpec>,
    body_limit_bytes: usize,
    reads_body: bool,
}

impl CheckState {
    #[must_use]
    pub fn new(access: AccessControl, spec: CheckSpec) -> Self {
        Self::with_config(access, spec, &AccessControlConfig::default())
    }

    #[must_use]
    pub fn with_config(access: AccessControl, spec: CheckSpec, cfg: &AccessControlConfig) -> Self {
        let reads_body = spec.check_ownership
            && spec.operands.iter().any(|op| op.source() == Source::Body);
        Self {
            access,
            spec: Arc::new(spec),
            body_limit_bytes: cfg.body_limit_bytes,
            reads_body,
        }
    }
}

impl std::fmt::Debug for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckState")
            .field("spec", &self.spec)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("reads_body", &self.reads_body)
            .finish_non_exhaustive()
    }
}

/// Access control middleware.
///
/// Must be attached with `route_layer` (or on a `MethodRouter`) so path
/// parameters are already extracted. The principal is read from the
/// [`Principal`] request extension set by an upstream authentication step.
///
/// On grant the [`Decision`] is inserted into the request extensions and the
/// handler runs; otherwise a problem response is returned.
pub async fn enforce(State(state): State<CheckState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let (data, body) = match request_data(&state, &mut parts, body).await {
        Ok(collected) => collected,
        Err(problem) => return problem.into_response(),
    };

    match state.access.evaluate(&state.spec, &data).await {
        Ok(decision @ Decision::Granted(_)) => {
            parts.extensions.insert(decision);
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(Decision::Denied(variant)) => forbidden(variant, &state.spec.resource).into_response(),
        Err(err) => access_error_to_problem(&err).into_response(),
    }
}

/// Collect the request bags; returns the body to forward to the handler.
async fn request_data(
    state: &CheckState,
    parts: &mut Parts,
    body: Body,
) -> Result<(RequestData, Body), Problem> {
    let mut data = RequestData::new()
        .with_params(path_params(parts).await)
        .with_query(query_params(parts)?);

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            data = data.with_header(name.as_str(), value);
        }
    }

    if let Some(principal) = parts.extensions.get::<Principal>() {
        data = data.with_principal(principal.clone());
    }

    if !state.reads_body {
        return Ok((data, body));
    }

    let bytes = buffer_body(parts, body, state.body_limit_bytes).await?;
    // Anything that is not JSON reads as an empty bag.
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    Ok((data.with_body(json), Body::from(bytes)))
}

async fn path_params(parts: &mut Parts) -> HashMap<String, String> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
        Err(_) => HashMap::new(),
    }
}

fn query_params(parts: &Parts) -> Result<HashMap<String, String>, Problem> {
    let Some(query) = parts.uri.query() else {
        return Ok(HashMap::new());
    };
    serde_urlencoded::from_str(query).map_err(|e| {
        tracing::debug!("Rejected malformed query string: {e}");
        Problem::new(StatusCode::BAD_REQUEST, "Bad Request", "Malformed query string")
    })
}

async fn buffer_body(parts: &Parts, body: Body, limit: usize) -> Result<Bytes, Problem> {
    let too_large = || {
        Problem::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Payload Too Large",
            format!("Request body exceeds {limit} bytes"),
        )
    };

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large());
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!("Failed to buffer request body: {e}");
        too_large()
    })
}
