//! The relay handler: one inbound request in, one backend call, one response
//! out, with the session cookie adjusted along the way.

use std::sync::Arc;

use {
    axum::{
        Json,
        body::{Body, Bytes},
        extract::State,
        http::{
            HeaderMap, HeaderValue, Method, StatusCode, Uri,
            header::{CONTENT_TYPE, LOCATION},
        },
        response::{IntoResponse, Response},
    },
    axum_extra::extract::cookie::CookieJar,
    percent_encoding::percent_decode_str,
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    error::{GatewayError, GatewayResult},
    session::{SessionCookies, SessionEffect, SessionGrant, extract_grant, redact_token},
    state::GatewayState,
    upstream::{BackendResponse, OutgoingRequest, forwarded_headers, select_body},
};

// ── Types ────────────────────────────────────────────────────────────────────

/// How the backend body was classified.
#[derive(Debug)]
enum Payload {
    /// JSON content-type with an empty body.
    EmptyJson,
    Json(Value),
    /// JSON content-type that failed to parse; relayed byte-for-byte.
    MalformedJson,
    /// Any non-JSON content.
    Opaque,
}

/// What the relayed response does to the browser's session cookie.
#[derive(Debug)]
pub enum SessionChange {
    Keep,
    Set(SessionGrant),
    Clear,
}

/// A translated backend response plus its cookie side effect.
pub struct Relayed {
    pub response: Response,
    pub session: SessionChange,
}

// ── Path resolution ──────────────────────────────────────────────────────────

/// Backend-relative path under the mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativePath {
    /// Segments as received, percent-encoding intact. Used for the target URL.
    pub encoded: String,
    /// Percent-decoded segments. Used for the session route lookup and logs.
    pub decoded: String,
}

/// Backend-relative path for an inbound path under `mount_path`.
///
/// Empty and dot segments (plain or percent-encoded) are dropped. Returns
/// `None` when nothing is left.
pub fn relative_path(path: &str, mount_path: &str) -> Option<RelativePath> {
    let rest = path.strip_prefix(mount_path)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let (encoded, decoded): (Vec<&str>, Vec<String>) = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| (s, percent_decode_str(s).decode_utf8_lossy().into_owned()))
        .filter(|(_, d)| d != "." && d != "..")
        .unzip();
    if encoded.is_empty() {
        return None;
    }
    Some(RelativePath {
        encoded: encoded.join("/"),
        decoded: decoded.join("/"),
    })
}

// ── Handler ──────────────────────────────────────────────────────────────────

/// Relay any method on any sub-path of the mount to the backend.
pub async fn handle(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> GatewayResult<(CookieJar, Response)> {
    let relative =
        relative_path(uri.path(), &state.mount_path).ok_or(GatewayError::MissingPath)?;
    let url = state.upstream.resolve(&relative.encoded, uri.query())?;

    let token = state.cookies.read(&jar);
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let outgoing = OutgoingRequest {
        method: method.clone(),
        url,
        headers: forwarded_headers(&headers, token.as_ref()),
        body: select_body(&method, content_type, body),
    };

    let backend = state.upstream.dispatch(outgoing).await?;
    debug!(
        method = %method,
        path = %relative.decoded,
        status = backend.status.as_u16(),
        authenticated = token.is_some(),
        "relayed request"
    );

    let effect = state.routes.effect_for(&relative.decoded);
    let relayed = translate(&method, effect, backend, &state.expiry_fields);
    let jar = apply_session_change(jar, &state.cookies, relayed.session, &relative.decoded);
    Ok((jar, relayed.response))
}

fn apply_session_change(
    jar: CookieJar,
    cookies: &SessionCookies,
    change: SessionChange,
    relative: &str,
) -> CookieJar {
    match change {
        SessionChange::Keep => jar,
        SessionChange::Set(grant) => {
            info!(path = %relative, expires = ?grant.expires, "session established");
            jar.add(cookies.issue(&grant))
        },
        SessionChange::Clear => {
            info!(path = %relative, "session cleared");
            jar.add(cookies.removal())
        },
    }
}

// ── Translation ──────────────────────────────────────────────────────────────

/// Turn a backend response into the client response and cookie change.
pub fn translate(
    method: &Method,
    effect: Option<SessionEffect>,
    backend: BackendResponse,
    expiry_fields: &[String],
) -> Relayed {
    let status = backend.status;
    let payload = classify(&backend);

    let creates_session = effect == Some(SessionEffect::Create) && status.is_success();
    let grant = match (&payload, creates_session) {
        (Payload::Json(value), true) => extract_grant(value, expiry_fields),
        _ => None,
    };

    let session = if status == StatusCode::UNAUTHORIZED
        || (effect == Some(SessionEffect::Destroy) && status.is_success())
    {
        SessionChange::Clear
    } else if let Some(grant) = grant {
        SessionChange::Set(grant)
    } else {
        SessionChange::Keep
    };

    let no_content = status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT;
    let mut response = if no_content || *method == Method::HEAD {
        with_status(Response::new(Body::empty()), status)
    } else {
        match payload {
            Payload::EmptyJson => (status, Json(Value::Null)).into_response(),
            Payload::Json(value) => {
                let client_value = if creates_session {
                    redact_token(&value).unwrap_or(value)
                } else {
                    value
                };
                (status, Json(client_value)).into_response()
            },
            Payload::MalformedJson | Payload::Opaque => {
                let content_type = backend
                    .content_type
                    .clone()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| HeaderValue::from_static("text/plain"));
                let mut response = with_status(Response::new(Body::from(backend.body)), status);
                response.headers_mut().insert(CONTENT_TYPE, content_type);
                response
            },
        }
    };

    if let Some(location) = backend.location {
        response.headers_mut().insert(LOCATION, location);
    }

    Relayed { response, session }
}

fn classify(backend: &BackendResponse) -> Payload {
    let is_json = backend
        .content_type
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
    if !is_json {
        return Payload::Opaque;
    }
    if backend.body.is_empty() {
        return Payload::EmptyJson;
    }
    match serde_json::from_slice(&backend.body) {
        Ok(value) => Payload::Json(value),
        Err(e) => {
            warn!(status = backend.status.as_u16(), error = %e, "backend sent malformed JSON, relaying raw body");
            Payload::MalformedJson
        },
    }
}

fn with_status(mut response: Response, status: StatusCode) -> Response {
    *response.status_mut() = status;
    response
}
