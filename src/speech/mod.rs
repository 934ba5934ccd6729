//! Text-to-speech through an external command
//!
//! Speech is opaque to the rest of the crate: it either completes or fails
//! with an upstream error carrying the underlying message.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::{Error, Result};

/// Slowest accepted speech rate, in words per minute
pub const MIN_RATE: u32 = 75;

/// Fastest accepted speech rate, in words per minute
pub const MAX_RATE: u32 = 225;

/// Rate used when none is requested
pub const DEFAULT_RATE: u32 = 150;

/// Default timeout for a single utterance
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Check a requested speech rate
///
/// # Errors
///
/// Returns `Error::Validation` if `rate` is outside `[MIN_RATE, MAX_RATE]`
pub fn validate_rate(rate: i64) -> Result<u32> {
    u32::try_from(rate)
        .ok()
        .filter(|r| (MIN_RATE..=MAX_RATE).contains(r))
        .ok_or_else(|| {
            Error::Validation(format!(
                "rate must be between {MIN_RATE} and {MAX_RATE} words per minute"
            ))
        })
}

/// Speaks text aloud
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` at `rate` words per minute, returning once speech finishes
    async fn speak(&self, text: &str, rate: u32) -> Result<()>;

    /// Whether the backend looks usable on this machine
    fn is_available(&self) -> bool {
        true
    }
}

/// Synthesizer that runs a command such as `say -r 150 "text"`
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    rate_flag: String,
    timeout: Duration,
}

impl CommandSynthesizer {
    /// Create a synthesizer for `program`, passing the rate after `rate_flag`
    #[must_use]
    pub fn new(program: impl Into<String>, rate_flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            rate_flag: rate_flag.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-utterance timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Argument list; `--` keeps text starting with `-` from reading as a flag
    fn args(&self, text: &str, rate: u32) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if !self.rate_flag.is_empty() {
            args.push(self.rate_flag.clone());
            args.push(rate.to_string());
        }
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, rate: u32) -> Result<()> {
        tracing::debug!(program = %self.program, rate, chars = text.len(), "speaking");

        let child = Command::new(&self.program)
            .args(self.args(text, rate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Upstream(format!("failed to start {}: {e}", self.program)))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Upstream(format!("speech timed out after {:?}", self.timeout)))?
            .map_err(|e| Error::Upstream(format!("speech failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::Upstream(format!(
                "{} exited with code {code}: {}",
                self.program,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}
