//! Session cookie lifecycle: which backend routes create or destroy a
//! session, how the token is pulled out of (and scrubbed from) a backend
//! payload, and how the HTTP-only cookie is written and cleared.

use std::collections::HashMap;

use {
    axum_extra::extract::cookie::{Cookie, CookieJar, SameSite},
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    time::{OffsetDateTime, format_description::well_known::Rfc3339},
};

use food_dispatch_config::{Environment, SessionConfig};

/// Key under which the backend returns the session token.
pub const TOKEN_FIELD: &str = "token";

// ── Route table ──────────────────────────────────────────────────────────────

/// What a successful response on a given backend path does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    Create,
    Destroy,
}

/// Static (path → effect) table, keyed by lowercased relative path.
#[derive(Debug, Clone, Default)]
pub struct SessionRoutes {
    routes: HashMap<String, SessionEffect>,
}

impl SessionRoutes {
    pub fn from_config(config: &SessionConfig) -> Self {
        let creation = config
            .creation_paths
            .iter()
            .map(|p| (p, SessionEffect::Create));
        let destruction = config
            .destruction_paths
            .iter()
            .map(|p| (p, SessionEffect::Destroy));
        let routes = creation
            .chain(destruction)
            .map(|(path, effect)| (normalize_route(path), effect))
            .collect();
        Self { routes }
    }

    /// Look up the effect for a backend-relative path (case-insensitive).
    pub fn effect_for(&self, relative_path: &str) -> Option<SessionEffect> {
        self.routes.get(&normalize_route(relative_path)).copied()
    }
}

fn normalize_route(path: &str) -> String {
    path.trim_matches('/').to_ascii_lowercase()
}

// ── Token ────────────────────────────────────────────────────────────────────

/// Opaque bearer credential issued by the backend.
pub struct SessionToken(Secret<String>);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// `Authorization` header value for the backend.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// A token plus the optional expiry the backend attached to it.
#[derive(Debug)]
pub struct SessionGrant {
    pub token: SessionToken,
    pub expires: Option<OffsetDateTime>,
}

/// Pull a session grant out of a session-creation response body.
///
/// Requires a JSON object with a non-empty string `token`. The expiry is read
/// from the first of `expiry_fields` holding a non-null value.
pub fn extract_grant(payload: &Value, expiry_fields: &[String]) -> Option<SessionGrant> {
    let object = payload.as_object()?;
    let token = object
        .get(TOKEN_FIELD)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?;
    let expires = expiry_fields
        .iter()
        .find_map(|field| object.get(field).filter(|v| !v.is_null()))
        .and_then(parse_expiry);
    Some(SessionGrant {
        token: SessionToken::new(token),
        expires,
    })
}

/// Interpret an expiry value: RFC 3339 strings, or integers as Unix epoch
/// milliseconds. Anything else yields `None`.
pub fn parse_expiry(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => OffsetDateTime::parse(s.trim(), &Rfc3339).ok(),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        },
        _ => None,
    }
}

/// Shallow copy of a JSON object with the token removed. `None` when the
/// payload is not an object or carries no token key.
pub fn redact_token(payload: &Value) -> Option<Value> {
    let object = payload.as_object()?;
    if !object.contains_key(TOKEN_FIELD) {
        return None;
    }
    let mut redacted = object.clone();
    redacted.remove(TOKEN_FIELD);
    Some(Value::Object(redacted))
}

// ── Cookies ──────────────────────────────────────────────────────────────────

/// Reads, issues and clears the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    name: String,
    secure: bool,
}

impl SessionCookies {
    pub fn new(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            secure,
        }
    }

    pub fn from_config(config: &SessionConfig, environment: Environment) -> Self {
        Self::new(config.cookie_name.clone(), config.secure_cookies(environment))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The token carried by the inbound request, if any.
    pub fn read(&self, jar: &CookieJar) -> Option<SessionToken> {
        jar.get(&self.name)
            .map(Cookie::value)
            .filter(|v| !v.is_empty())
            .map(SessionToken::new)
    }

    /// Cookie holding a freshly issued token.
    pub fn issue(&self, grant: &SessionGrant) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), grant.token.expose().to_owned()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/");
        if let Some(expires) = grant.expires {
            builder = builder.expires(expires);
        }
        builder.build()
    }

    /// Removal cookie: empty value, `Max-Age=0` and an expiry in the past.
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), String::new()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .build();
        cookie.make_removal();
        cookie
    }
}
