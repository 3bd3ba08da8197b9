//! Config schema types (gateway listener, backend origin, session cookie).

use {
    anyhow::Context,
    serde::{Deserialize, Serialize},
    url::Url,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub environment: Environment,
    pub gateway: GatewaySection,
    pub backend: BackendConfig,
    pub session: SessionConfig,
}

/// Runtime environment. Only affects defaults such as the `Secure` cookie flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse a loose environment name (`production`, `prod`, anything else is development).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Inbound listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub bind: String,
    pub port: u16,
    /// Prefix the proxy is mounted under. Everything after it is the
    /// backend-relative path.
    pub mount_path: String,
    /// Largest inbound request body relayed to the backend.
    pub max_body_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            mount_path: "/api".into(),
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

impl GatewaySection {
    /// Mount path with exactly one leading slash and no trailing slash.
    pub fn normalized_mount_path(&self) -> String {
        let trimmed = self.mount_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Backend origin the gateway forwards to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub protocol: String,
    pub host: String,
    /// `None` omits the port from the computed URL.
    pub port: Option<u16>,
    pub base_path: String,
    /// Full base URL. Takes precedence over protocol/host/port/base_path.
    pub base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            protocol: "http".into(),
            host: "localhost".into(),
            port: Some(8080),
            base_path: "/api".into(),
            base_url: None,
        }
    }
}

impl BackendConfig {
    /// Resolve the backend base URL, without a trailing slash.
    pub fn base_url(&self) -> anyhow::Result<Url> {
        let raw = match self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(explicit) => explicit.trim().trim_end_matches('/').to_string(),
            None => {
                let base_path = if self.base_path.starts_with('/') {
                    self.base_path.clone()
                } else {
                    format!("/{}", self.base_path)
                };
                let port = self.port.map(|p| format!(":{p}")).unwrap_or_default();
                format!("{}://{}{port}{base_path}", self.protocol, self.host)
                    .trim_end_matches('/')
                    .to_string()
            },
        };
        Url::parse(&raw).with_context(|| format!("invalid backend base url: {raw}"))
    }
}

/// Session cookie and the backend routes that create or destroy a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Explicit `Secure` attribute. Falls back to the environment when unset.
    pub secure: Option<bool>,
    /// Relative paths whose successful response carries a new session token.
    pub creation_paths: Vec<String>,
    /// Relative paths whose successful response ends the session.
    pub destruction_paths: Vec<String>,
    /// Keys checked, in order, for the session expiry in a creation response.
    pub expiry_fields: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "fd_session".into(),
            secure: None,
            creation_paths: vec![
                "auth/login".into(),
                "auth/register".into(),
                "auth/register-tenant-user".into(),
            ],
            destruction_paths: vec!["auth/logout".into()],
            expiry_fields: vec!["expires_at".into(), "expiresAt".into()],
        }
    }
}

impl SessionConfig {
    pub fn secure_cookies(&self, environment: Environment) -> bool {
        self.secure.unwrap_or(environment.is_production())
    }
}
