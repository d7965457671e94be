//! Application configuration: TOML settings and the config manager.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EncoderSettings, LimitSettings, PathSettings, Settings};
