//! `FOOD_DISPATCH_*` environment variables layered on top of the file config.

use tracing::warn;

use crate::schema::{DispatchConfig, Environment};

pub const ENV_API_PROTOCOL: &str = "FOOD_DISPATCH_API_PROTOCOL";
pub const ENV_API_HOST: &str = "FOOD_DISPATCH_API_HOST";
pub const ENV_API_PORT: &str = "FOOD_DISPATCH_API_PORT";
pub const ENV_API_BASE_PATH: &str = "FOOD_DISPATCH_API_BASE_PATH";
pub const ENV_API_BASE_URL: &str = "FOOD_DISPATCH_API_BASE_URL";
pub const ENV_SESSION_COOKIE: &str = "FOOD_DISPATCH_SESSION_COOKIE";
pub const ENV_COOKIE_SECURE: &str = "FOOD_DISPATCH_COOKIE_SECURE";
pub const ENV_ENVIRONMENT: &str = "FOOD_DISPATCH_ENV";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut DispatchConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides using an explicit lookup.
pub fn apply_env_overrides_with(
    config: &mut DispatchConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup(ENV_API_PROTOCOL) {
        config.backend.protocol = v;
    }
    if let Some(v) = lookup(ENV_API_HOST) {
        config.backend.host = v;
    }
    if let Some(v) = lookup(ENV_API_PORT) {
        let v = v.trim();
        if v.is_empty() {
            config.backend.port = None;
        } else {
            match v.parse::<u16>() {
                Ok(port) => config.backend.port = Some(port),
                Err(e) => warn!(var = ENV_API_PORT, value = v, error = %e, "ignoring invalid port"),
            }
        }
    }
    if let Some(v) = lookup(ENV_API_BASE_PATH) {
        config.backend.base_path = v;
    }
    if let Some(v) = lookup(ENV_API_BASE_URL) {
        config.backend.base_url = Some(v);
    }
    if let Some(v) = lookup(ENV_SESSION_COOKIE).filter(|v| !v.trim().is_empty()) {
        config.session.cookie_name = v;
    }
    if let Some(v) = lookup(ENV_COOKIE_SECURE) {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.session.secure = Some(true),
            "0" | "false" | "no" => config.session.secure = Some(false),
            other => warn!(var = ENV_COOKIE_SECURE, value = other, "ignoring invalid boolean"),
        }
    }
    if let Some(v) = lookup(ENV_ENVIRONMENT) {
        config.environment = Environment::from_name(&v);
    }
}
