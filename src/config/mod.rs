//! Configuration management for voice gate
//!
//! Values resolve as environment variable > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::classifier::Allowlist;
use crate::speech::{DEFAULT_RATE, MAX_RATE, MIN_RATE};
use crate::{Error, Result};

use file::ConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5111;

/// Tool-name prefix of the assistant's own voice tools
pub const DEFAULT_EXEMPT_TOOL_PREFIX: &str = "mcp__voice-gate__";

/// Voice gate configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub speech: SpeechConfig,
    pub wait: WaitConfig,
    pub classifier: ClassifierConfig,
    pub hook: HookConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech command configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Program invoked to speak
    pub command: String,

    /// Flag preceding the rate argument
    pub rate_flag: String,

    /// Words per minute for assistant replies
    pub rate: u32,

    pub timeout: Duration,
}

/// Wait-for-utterance polling configuration
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Wait used when the request names none
    pub timeout: Duration,

    /// Longest wait a request may ask for
    pub max_timeout: Duration,

    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_timeout: Duration::from_secs(600),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WaitConfig {
    /// Wait duration for a request, capped at `max_timeout`
    #[must_use]
    pub fn effective_timeout(&self, requested_secs: Option<u64>) -> Duration {
        requested_secs
            .map_or(self.timeout, Duration::from_secs)
            .min(self.max_timeout)
    }
}

/// Command classifier configuration
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfig {
    /// Allowlist patterns from the config file
    pub allow: Vec<String>,

    /// JSON settings files contributing `permissions.allow` patterns
    pub settings_files: Vec<PathBuf>,

    pub audit_log: PathBuf,
}

impl ClassifierConfig {
    /// Load the classifier section alone
    ///
    /// Never fails: an invalid value elsewhere in the configuration must not
    /// keep the classifier from answering.
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(&file::load_config_file(), &|key| std::env::var(key).ok())
    }

    /// Resolve the classifier section from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: &ConfigFile, env: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            allow: fc.classifier.allow.clone(),
            settings_files: fc.classifier.settings_files.clone(),
            audit_log: env("VOICE_GATE_AUDIT_LOG")
                .map(PathBuf::from)
                .or_else(|| fc.classifier.audit_log.clone())
                .unwrap_or_else(|| data_dir().join("audit.jsonl")),
        }
    }

    /// Build the allowlist from configured patterns and settings files
    ///
    /// Unreadable settings files are skipped with a warning.
    #[must_use]
    pub fn allowlist(&self) -> Allowlist {
        let mut allowlist = Allowlist::from_patterns(&self.allow);
        for path in &self.settings_files {
            match Allowlist::read_settings_patterns(path) {
                Ok(patterns) => allowlist.extend(Allowlist::from_patterns(patterns)),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping unreadable settings file"
                ),
            }
        }
        allowlist
    }
}

/// Gate hook client configuration
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Base URL of the running server
    pub server_url: String,

    /// Tools whose names start with any of these are never gated
    pub exempt_tool_prefixes: Vec<String>,

    pub timeout: Duration,
}

impl HookConfig {
    /// Load the hook section alone, ignoring invalid values in other sections
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(&file::load_config_file(), &|key| std::env::var(key).ok())
    }

    /// Resolve the hook section from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: &ConfigFile, env: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            server_url: env("VOICE_GATE_URL")
                .or_else(|| fc.hook.server_url.clone())
                .unwrap_or_else(|| format!("http://127.0.0.1:{}", resolve_port(fc, env))),
            exempt_tool_prefixes: fc
                .hook
                .exempt_tool_prefixes
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_EXEMPT_TOOL_PREFIX.to_string()]),
            timeout: Duration::from_secs(fc.hook.timeout_secs.unwrap_or(5)),
        }
    }
}

fn resolve_port(fc: &ConfigFile, env: &impl Fn(&str) -> Option<String>) -> u16 {
    env("VOICE_GATE_PORT")
        .and_then(|s| s.parse().ok())
        .or(fc.server.port)
        .unwrap_or(DEFAULT_PORT)
}

/// Data directory (~/.local/share/voice-gate on Linux)
fn data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("voice-gate"))
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the speech command is empty or the poll
    /// interval is zero
    pub fn from_sources(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let classifier = ClassifierConfig::from_sources(&fc, &env);
        let hook = HookConfig::from_sources(&fc, &env);

        let port = resolve_port(&fc, &env);
        let host = env("VOICE_GATE_HOST")
            .or(fc.server.host)
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let server = ServerConfig { host, port };

        let speech = SpeechConfig {
            command: env("VOICE_GATE_SPEECH_COMMAND")
                .or(fc.speech.command)
                .unwrap_or_else(|| "say".to_string()),
            rate_flag: fc.speech.rate_flag.unwrap_or_else(|| "-r".to_string()),
            rate: fc
                .speech
                .rate
                .unwrap_or(DEFAULT_RATE)
                .clamp(MIN_RATE, MAX_RATE),
            timeout: Duration::from_secs(fc.speech.timeout_secs.unwrap_or(120)),
        };
        if speech.command.trim().is_empty() {
            return Err(Error::Config("speech command must not be empty".to_string()));
        }

        let defaults = WaitConfig::default();
        let wait = WaitConfig {
            timeout: fc
                .wait
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            max_timeout: fc
                .wait
                .max_timeout_secs
                .map_or(defaults.max_timeout, Duration::from_secs),
            poll_interval: fc
                .wait
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
        };
        if wait.poll_interval.is_zero() {
            return Err(Error::Config("wait poll interval must be positive".to_string()));
        }

        Ok(Self {
            server,
            speech,
            wait,
            classifier,
            hook,
        })
    }
}
