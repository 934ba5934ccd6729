//! Assistant hook client for the action gate
//!
//! Runs as a short-lived process per assistant step: read the hook payload,
//! ask the server whether the step may proceed, and print a block decision
//! when it may not. An unreachable server means there is no voice session,
//! so the hook stays silent.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::HookConfig;
use crate::gate::{GateAction, GateDecision};
use crate::{Error, Result};

/// Assistant lifecycle point the hook is installed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookKind {
    /// Before any tool runs
    PreToolUse,
    /// Before the assistant ends its turn
    Stop,
}

impl HookKind {
    /// Gate action checked at this point
    #[must_use]
    pub const fn action(self) -> GateAction {
        match self {
            Self::PreToolUse => GateAction::ToolUse,
            Self::Stop => GateAction::Stop,
        }
    }
}

/// Fields of the hook payload the gate cares about
#[derive(Debug, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub tool_name: Option<String>,
}

impl HookPayload {
    /// Parse a payload, treating unreadable input as empty
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "unreadable hook payload");
            Self::default()
        })
    }
}

/// Block response understood by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutput {
    pub decision: String,
    pub reason: String,
}

impl BlockOutput {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            decision: "block".to_string(),
            reason: reason.into(),
        }
    }
}

/// Whether `tool_name` starts with any exempt prefix
#[must_use]
pub fn is_exempt(tool_name: &str, exempt_prefixes: &[String]) -> bool {
    exempt_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && tool_name.starts_with(prefix.as_str()))
}

/// HTTP client for `/api/validate-action`
#[derive(Debug, Clone)]
pub struct GateClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ValidateActionRequest {
    action: GateAction,
}

impl GateClient {
    /// Create a client for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the server whether `action` may proceed
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it
    pub async fn validate(&self, action: GateAction) -> Result<GateDecision> {
        let url = format!("{}/api/validate-action", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ValidateActionRequest { action })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "validate-action returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Run one hook invocation
///
/// Returns the block output to print, or `None` when the step may proceed.
pub async fn run(kind: HookKind, raw_payload: &str, config: &HookConfig) -> Option<BlockOutput> {
    let payload = HookPayload::parse(raw_payload);

    if kind == HookKind::PreToolUse
        && let Some(tool_name) = payload.tool_name.as_deref()
        && is_exempt(tool_name, &config.exempt_tool_prefixes)
    {
        tracing::debug!(tool_name, "exempt tool");
        return None;
    }

    let client = match GateClient::new(&config.server_url, config.timeout) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build gate client");
            return None;
        }
    };

    match client.validate(kind.action()).await {
        Ok(decision) if decision.allowed => None,
        Ok(decision) => Some(BlockOutput::new(
            decision
                .reason
                .unwrap_or_else(|| "voice gate blocked this step".to_string()),
        )),
        Err(e) => {
            tracing::debug!(error = %e, "voice gate unreachable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parsing() {
        let payload = HookPayload::parse(r#"{"tool_name":"Bash","tool_input":{"command":"ls"}}"#);
        assert_eq!(payload.tool_name.as_deref(), Some("Bash"));

        assert!(HookPayload::parse("not json").tool_name.is_none());
        assert!(HookPayload::parse(r#"{"session_id":"abc"}"#).tool_name.is_none());
    }

    #[test]
    fn test_exempt_prefixes() {
        let prefixes = vec!["mcp__voice-gate__".to_string()];
        assert!(is_exempt("mcp__voice-gate__speak", &prefixes));
        assert!(!is_exempt("Bash", &prefixes));
        assert!(!is_exempt("Bash", &[String::new()]));
    }

    #[test]
    fn test_block_output_shape() {
        let json = serde_json::to_value(BlockOutput::new("speak first")).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "block", "reason": "speak first"}));
    }

    #[test]
    fn test_kind_maps_to_action() {
        assert_eq!(HookKind::PreToolUse.action(), GateAction::ToolUse);
        assert_eq!(HookKind::Stop.action(), GateAction::Stop);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_silent() {
        let config = HookConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            exempt_tool_prefixes: Vec::new(),
            timeout: Duration::from_millis(500),
        };
        assert!(run(HookKind::Stop, "{}", &config).await.is_none());
    }
}
