use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::DispatchConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "food-dispatch.toml",
    "food-dispatch.yaml",
    "food-dispatch.yml",
    "food-dispatch.json",
];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, config discovery only looks in
/// this directory (project-local and user-global paths are skipped).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<DispatchConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./food-dispatch.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/food-dispatch/food-dispatch.{toml,yaml,yml,json}` (user-global)
///
/// Returns `DispatchConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> DispatchConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return DispatchConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            DispatchConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        // Override is set: don't fall through to other locations.
        return first_existing(&dir);
    }

    first_existing(Path::new(".")).or_else(|| user_config_dir().and_then(|d| first_existing(&d)))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn user_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("food-dispatch"))
}

/// Returns the config directory: override, or `~/.config/food-dispatch/`.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_override().or_else(user_config_dir)
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("food-dispatch.toml")
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<DispatchConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::Environment};

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food-dispatch.toml");
        std::fs::write(
            &path,
            r#"
environment = "production"

[backend]
host = "orders.internal"
port = 9090

[session]
cookie_name = "bakery_session"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.backend.host, "orders.internal");
        assert_eq!(cfg.backend.port, Some(9090));
        assert_eq!(cfg.backend.protocol, "http");
        assert_eq!(cfg.session.cookie_name, "bakery_session");
        assert_eq!(cfg.session.creation_paths.len(), 3);
        assert_eq!(
            cfg.backend.base_url().unwrap().as_str(),
            "http://orders.internal:9090/api"
        );
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("food-dispatch.yaml");
        std::fs::write(&yaml, "gateway:\n  port: 4000\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().gateway.port, 4000);

        let json = dir.path().join("food-dispatch.json");
        std::fs::write(
            &json,
            r#"{"backend": {"base_url": "https://api.test/v1"}}"#,
        )
        .unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.backend.base_url.as_deref(), Some("https://api.test/v1"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food-dispatch.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn first_existing_respects_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("food-dispatch.json"), "{}").unwrap();
        std::fs::write(dir.path().join("food-dispatch.yaml"), "{}").unwrap();
        let found = first_existing(dir.path()).unwrap();
        assert!(found.ends_with("food-dispatch.yaml"));
    }

    #[test]
    fn config_dir_override_restricts_discovery() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());
        assert!(find_config_file().is_none());
        assert_eq!(
            find_or_default_config_path(),
            dir.path().join("food-dispatch.toml")
        );

        std::fs::write(dir.path().join("food-dispatch.yml"), "gateway:\n  port: 4100\n").unwrap();
        assert_eq!(discover_and_load().gateway.port, 4100);
        assert_eq!(config_dir().as_deref(), Some(dir.path()));

        clear_config_dir();
        assert_ne!(config_dir().as_deref(), Some(dir.path()));
    }
}
