//! Configuration for the food-dispatch session gateway.
//!
//! Values come from (lowest to highest precedence): built-in defaults, a
//! `food-dispatch.{toml,yaml,yml,json}` file, `FOOD_DISPATCH_*` environment
//! variables, and finally CLI flags applied by the binary.

pub mod env_overrides;
pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    env_overrides::{apply_env_overrides, apply_env_overrides_with},
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_config_file,
        find_or_default_config_path, load_config, set_config_dir,
    },
    schema::{BackendConfig, DispatchConfig, Environment, GatewaySection, SessionConfig},
};
