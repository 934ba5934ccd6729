//! Tool invocation classifier: allow, deny, or ask for approval
//!
//! The destructive check always runs first and overrides the allowlist, so a
//! blanket `Bash` entry still cannot approve `rm -rf`. Every classification
//! is appended to the audit sink, whatever the outcome.

mod allowlist;
mod audit;
pub mod rules;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use allowlist::{Allowlist, AllowlistEntry, CommandMatch};
pub use audit::{AuditRecord, AuditSink, JsonlAuditLog, MemoryAuditLog, NullAuditLog};

/// Tool whose invocations are shell commands
pub const SHELL_TOOL: &str = "Bash";

/// Tool that deletes files outright
pub const DELETE_TOOL: &str = "Delete";

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Deny,
    Ask,
}

impl Decision {
    /// Lowercase form used in hook responses
    #[must_use]
    pub const fn as_hook_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Ask => "ask",
        }
    }
}

/// Decision plus the reason shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub decision: Decision,
    pub reason: String,
}

impl Classification {
    fn new(decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
        }
    }

    /// Hook response object for this classification
    #[must_use]
    pub fn to_hook_output(&self) -> serde_json::Value {
        serde_json::json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": self.decision.as_hook_str(),
                "permissionDecisionReason": self.reason,
            }
        })
    }
}

/// Tool invocation as received from the hook
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

/// Command string of a shell invocation
#[must_use]
pub fn shell_command<'a>(tool_name: &str, tool_input: &'a serde_json::Value) -> Option<&'a str> {
    if tool_name != SHELL_TOOL {
        return None;
    }
    tool_input.get("command").and_then(serde_json::Value::as_str)
}

/// Classify an invocation without auditing it
#[must_use]
pub fn classify_invocation(
    tool_name: &str,
    tool_input: &serde_json::Value,
    allowlist: &Allowlist,
) -> Classification {
    if tool_name == DELETE_TOOL {
        return Classification::new(
            Decision::Deny,
            "Delete is a destructive operation and always requires approval",
        );
    }

    let command = shell_command(tool_name, tool_input);
    if let Some(operation) = command.and_then(rules::destructive_operation) {
        return Classification::new(
            Decision::Deny,
            format!("destructive operation detected: {operation}; requires explicit approval"),
        );
    }

    let covering = match command {
        Some(command) => allowlist.cover_command(tool_name, command),
        None => allowlist.find(tool_name, None).map(|entry| vec![entry]),
    };

    match covering {
        Some(entries) => {
            let entries: Vec<String> = entries.iter().map(ToString::to_string).collect();
            Classification::new(
                Decision::Allow,
                format!("allowlisted by {}", entries.join(", ")),
            )
        }
        None => match command {
            Some(command) => Classification::new(
                Decision::Ask,
                format!("{tool_name} command is not allowlisted: {command}"),
            ),
            None => Classification::new(Decision::Ask, format!("{tool_name} is not allowlisted")),
        },
    }
}

/// Classifier bound to an allowlist and an audit sink
#[derive(Clone)]
pub struct CommandClassifier {
    allowlist: Allowlist,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for CommandClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClassifier")
            .field("allowlist", &self.allowlist)
            .finish_non_exhaustive()
    }
}

impl CommandClassifier {
    #[must_use]
    pub fn new(allowlist: Allowlist, audit: Arc<dyn AuditSink>) -> Self {
        Self { allowlist, audit }
    }

    #[must_use]
    pub const fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Classify a parsed invocation and audit it
    #[must_use]
    pub fn classify(&self, tool_name: &str, tool_input: &serde_json::Value) -> Classification {
        let classification = classify_invocation(tool_name, tool_input, &self.allowlist);
        self.record(tool_name, &classification, tool_input.to_string());
        classification
    }

    /// Classify a raw JSON invocation and audit it
    ///
    /// Input that does not parse resolves to `Ask`, never `Allow`.
    #[must_use]
    pub fn classify_raw(&self, raw: &str) -> Classification {
        match serde_json::from_str::<ToolInvocation>(raw) {
            Ok(invocation) => {
                let classification =
                    classify_invocation(&invocation.tool_name, &invocation.tool_input, &self.allowlist);
                self.record(&invocation.tool_name, &classification, raw.to_string());
                classification
            }
            Err(e) => {
                let classification = Classification::new(
                    Decision::Ask,
                    format!("could not parse tool invocation ({e}); approval required"),
                );
                self.record("unknown", &classification, raw.to_string());
                classification
            }
        }
    }

    fn record(&self, tool_name: &str, classification: &Classification, raw_input: String) {
        tracing::debug!(
            tool = tool_name,
            decision = classification.decision.as_hook_str(),
            reason = %classification.reason,
            "classified tool invocation"
        );
        self.audit.append(&AuditRecord {
            timestamp: Utc::now(),
            tool_name: tool_name.to_string(),
            decision: classification.decision,
            reason: classification.reason.clone(),
            raw_input,
        });
    }
}
