//! Settings struct with TOML-based sections.
//!
//! Every field carries a serde default so a partial config file (or none at
//! all) yields a working configuration.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Encoder invocation settings.
    #[serde(default)]
    pub encoder: EncoderSettings,

    /// Session housekeeping limits.
    #[serde(default)]
    pub limits: LimitSettings,
}

/// Directories for uploaded images, rendered output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder uploaded images are staged in.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,

    /// Folder rendered artifacts are written to.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_upload_folder() -> String {
    "uploads".to_string()
}

fn default_output_folder() -> String {
    "output".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            upload_folder: default_upload_folder(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Encoder invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Path or name of the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Seconds between encoder progress reports on stderr.
    #[serde(default = "default_stats_period")]
    pub stats_period: f64,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_stats_period() -> f64 {
    0.5
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            stats_period: default_stats_period(),
        }
    }
}

/// Session housekeeping limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Minutes a finished session is kept before eviction.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,
}

fn default_session_ttl_minutes() -> u64 {
    30
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.paths.upload_folder, "uploads");
        assert_eq!(settings.paths.output_folder, "output");
        assert_eq!(settings.encoder.ffmpeg_path, "ffmpeg");
        assert_eq!(settings.encoder.stats_period, 0.5);
        assert_eq!(settings.limits.session_ttl_minutes, 30);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings =
            toml::from_str("[encoder]\nffmpeg_path = \"/usr/local/bin/ffmpeg\"\n").unwrap();
        assert_eq!(settings.encoder.ffmpeg_path, "/usr/local/bin/ffmpeg");
        assert_eq!(settings.encoder.stats_period, 0.5);
        assert_eq!(settings.paths.output_folder, "output");
    }

    #[test]
    fn empty_toml_is_valid() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.limits.session_ttl_minutes, 30);
    }
}
