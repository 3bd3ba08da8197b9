use std::sync::Arc;

use food_dispatch_config::DispatchConfig;

use crate::{
    session::{SessionCookies, SessionRoutes},
    upstream::Upstream,
};

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared, read-only gateway state. Built once at startup and handed to every
/// request; nothing in here is mutated per request.
#[derive(Debug)]
pub struct GatewayState {
    /// Server version string.
    pub version: String,
    /// Normalized mount prefix (`/api`, or empty for root).
    pub mount_path: String,
    /// Inbound body size limit.
    pub max_body_bytes: usize,
    /// Backend origin client.
    pub upstream: Upstream,
    /// Session-creation / -destruction path table.
    pub routes: SessionRoutes,
    /// Session cookie reader/writer.
    pub cookies: SessionCookies,
    /// Keys checked for the session expiry in a creation response.
    pub expiry_fields: Vec<String>,
}

impl GatewayState {
    /// Build the full state from resolved configuration.
    pub fn from_config(config: &DispatchConfig) -> anyhow::Result<Arc<Self>> {
        let upstream = Upstream::new(config.backend.base_url()?)?;
        Ok(Arc::new(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mount_path: config.gateway.normalized_mount_path(),
            max_body_bytes: config.gateway.max_body_bytes,
            upstream,
            routes: SessionRoutes::from_config(&config.session),
            cookies: SessionCookies::from_config(&config.session, config.environment),
            expiry_fields: config.session.expiry_fields.clone(),
        }))
    }
}
