//! Configuration sources: the TOML config file and environment lookups.

mod env;
mod loader;

pub use env::{EnvSource, LayeredEnv, MapEnv, ProcessEnv};
pub use loader::{Config, ConfigError, Defaults};
