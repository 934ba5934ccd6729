//! TOML configuration file loading
//!
//! Supports `~/.config/voice-gate/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub speech: SpeechFileConfig,

    #[serde(default)]
    pub wait: WaitFileConfig,

    #[serde(default)]
    pub classifier: ClassifierFileConfig,

    #[serde(default)]
    pub hook: HookFileConfig,
}

/// HTTP server settings
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
    pub host: Option<String>,
}

/// Speech command settings
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Program invoked to speak (e.g. "say", "espeak")
    pub command: Option<String>,

    /// Flag preceding the rate argument; empty to omit the rate
    pub rate_flag: Option<String>,

    /// Words per minute for assistant replies
    pub rate: Option<u32>,

    pub timeout_secs: Option<u64>,
}

/// Wait-for-utterance polling settings
#[derive(Debug, Default, Deserialize)]
pub struct WaitFileConfig {
    pub timeout_secs: Option<u64>,
    pub max_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

/// Command classifier settings
#[derive(Debug, Default, Deserialize)]
pub struct ClassifierFileConfig {
    /// Allowlist patterns, e.g. `Bash(npm test:*)`
    #[serde(default)]
    pub allow: Vec<String>,

    /// JSON settings files whose `permissions.allow` arrays are merged in
    #[serde(default)]
    pub settings_files: Vec<PathBuf>,

    pub audit_log: Option<PathBuf>,
}

/// Gate hook client settings
#[derive(Debug, Default, Deserialize)]
pub struct HookFileConfig {
    pub server_url: Option<String>,
    pub exempt_tool_prefixes: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-gate/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-gate").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file() {
        let config: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 6000

            [classifier]
            allow = ["Bash(npm test:*)"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, Some(6000));
        assert_eq!(config.server.host, None);
        assert_eq!(config.classifier.allow, ["Bash(npm test:*)"]);
        assert!(config.speech.command.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_file_from(Path::new("/nonexistent/voice-gate.toml"));
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nport = ").unwrap();
        let config = load_config_file_from(file.path());
        assert!(config.server.port.is_none());
    }
}
