//! Outgoing side of the relay: target resolution, header allow-list, body
//! selection and the single backend call.

use {
    axum::http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
    },
    bytes::Bytes,
    reqwest::{Client, redirect},
    tracing::{debug, warn},
    url::Url,
};

use crate::{error::GatewayResult, session::SessionToken};

/// Inbound request headers copied to the backend. Everything else,
/// including any caller-supplied `Authorization`, is dropped.
pub const FORWARDED_REQUEST_HEADERS: &[&str] =
    &["content-type", "accept", "accept-language", "user-agent"];

/// Request to the backend origin, built once per inbound request.
#[derive(Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<OutgoingBody>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingBody {
    /// JSON or untyped bodies, forwarded as text.
    Text(String),
    /// Uploads, multipart and any other binary payload.
    Binary(Bytes),
}

/// The origin's reply, fully buffered.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub location: Option<HeaderValue>,
    pub body: Bytes,
}

/// Client for the backend origin. Redirects are never followed.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: Url,
}

impl Upstream {
    /// Client for `base_url`, which gains a trailing `/` so relative paths
    /// resolve beneath it.
    pub fn new(mut base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a backend-relative path onto the base URL and attach the
    /// original query string verbatim.
    pub fn resolve(&self, relative_path: &str, query: Option<&str>) -> GatewayResult<Url> {
        // "./" keeps segments like "http:" from being read as a scheme.
        let mut target = self.base_url.join(&format!("./{relative_path}"))?;
        target.set_query(query.filter(|q| !q.is_empty()));
        Ok(target)
    }

    /// Send the request exactly once and buffer the response.
    ///
    /// reqwest keeps no response cache, so every call reaches the origin.
    pub async fn dispatch(&self, request: OutgoingRequest) -> GatewayResult<BackendResponse> {
        debug!(method = %request.method, url = %request.url, "dispatching to backend");
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        builder = match request.body {
            Some(OutgoingBody::Text(text)) => builder.body(text),
            Some(OutgoingBody::Binary(bytes)) => builder.body(bytes),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let location = response.headers().get(LOCATION).cloned();
        let body = response.bytes().await?;

        Ok(BackendResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

/// Copy the allow-listed headers and attach the bearer credential.
pub fn forwarded_headers(inbound: &HeaderMap, token: Option<&SessionToken>) -> HeaderMap {
    let mut outgoing = HeaderMap::new();
    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = inbound.get(*name)
            && !value.is_empty()
        {
            outgoing.insert(HeaderName::from_static(*name), value.clone());
        }
    }
    if let Some(token) = token {
        match HeaderValue::try_from(token.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                outgoing.insert(AUTHORIZATION, value);
            },
            Err(_) => warn!("session cookie is not a valid header value, sending anonymously"),
        }
    }
    outgoing
}

/// Methods that conventionally carry a request body.
pub fn method_allows_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Decide what, if anything, to send as the backend request body.
///
/// JSON or untyped bodies go as text; anything else (or text that is not
/// valid UTF-8) goes as raw bytes. An empty body is omitted entirely.
pub fn select_body(method: &Method, content_type: Option<&str>, body: Bytes) -> Option<OutgoingBody> {
    if !method_allows_body(method) || body.is_empty() {
        return None;
    }
    let content_type = content_type.unwrap_or_default();
    let textual = content_type.is_empty() || content_type.contains("application/json");
    if !textual {
        return Some(OutgoingBody::Binary(body));
    }
    match String::from_utf8(body.to_vec()) {
        Ok(text) => Some(OutgoingBody::Text(text)),
        Err(_) => Some(OutgoingBody::Binary(body)),
    }
}
