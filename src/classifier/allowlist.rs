//! Allowlist of tools and shell command prefixes exempt from approval prompts

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use super::rules::split_segments;
use crate::{Error, Result};

/// How an entry constrains the command of a shell invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMatch {
    /// Every invocation of the tool
    Any,
    /// Commands equal to the prefix or continuing after it with whitespace
    Prefix(String),
    /// Exactly this command
    Exact(String),
}

/// One allowlist pattern
///
/// Parsed from the forms `Tool`, `Tool(*)`, `Tool(prefix:*)`,
/// `Tool(exact command)` and `mcp__server__*` (tool-name glob).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistEntry {
    pub tool: String,
    pub command: CommandMatch,
}

impl AllowlistEntry {
    /// Entry allowing every invocation of `tool`
    #[must_use]
    pub fn tool(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            command: CommandMatch::Any,
        }
    }

    /// Entry allowing `tool` invocations whose command starts with `prefix`
    #[must_use]
    pub fn prefix(tool: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            command: CommandMatch::Prefix(prefix.into()),
        }
    }

    fn matches_tool(&self, tool_name: &str) -> bool {
        self.tool
            .strip_suffix('*')
            .map_or(self.tool == tool_name, |stem| tool_name.starts_with(stem))
    }

    /// Whether an invocation of `tool_name` with `command` is covered
    ///
    /// `command` is `None` for tools that are not shell invocations; such
    /// calls only match entries without a command constraint.
    #[must_use]
    pub fn matches(&self, tool_name: &str, command: Option<&str>) -> bool {
        if !self.matches_tool(tool_name) {
            return false;
        }

        match (&self.command, command.map(str::trim)) {
            (CommandMatch::Any, _) => true,
            (CommandMatch::Prefix(prefix), Some(command)) => command
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace)),
            (CommandMatch::Exact(exact), Some(command)) => command == exact,
            (_, None) => false,
        }
    }
}

impl FromStr for AllowlistEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::Validation(format!("invalid allowlist pattern '{s}'"));

        let Some((tool, rest)) = s.split_once('(') else {
            if s.is_empty() || s.contains(')') {
                return Err(invalid());
            }
            return Ok(Self::tool(s));
        };

        let inner = rest.strip_suffix(')').ok_or_else(invalid)?.trim();
        let tool = tool.trim();
        if tool.is_empty() || inner.is_empty() {
            return Err(invalid());
        }

        let command = if inner == "*" {
            CommandMatch::Any
        } else if let Some(prefix) = inner.strip_suffix(":*") {
            CommandMatch::Prefix(prefix.trim_end().to_string())
        } else {
            CommandMatch::Exact(inner.to_string())
        };

        Ok(Self {
            tool: tool.to_string(),
            command,
        })
    }
}

impl fmt::Display for AllowlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command {
            CommandMatch::Any => write!(f, "{}", self.tool),
            CommandMatch::Prefix(prefix) => write!(f, "{}({prefix}:*)", self.tool),
            CommandMatch::Exact(exact) => write!(f, "{}({exact})", self.tool),
        }
    }
}

/// Configured allowlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    entries: Vec<AllowlistEntry>,
}

/// Settings file layout: `{"permissions": {"allow": [...]}}`
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, Default, Deserialize)]
struct Permissions {
    #[serde(default)]
    allow: Vec<String>,
}

impl Allowlist {
    /// Parse patterns, skipping and logging any that are malformed
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = patterns
            .into_iter()
            .filter_map(|pattern| match pattern.as_ref().parse::<AllowlistEntry>() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping allowlist entry");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Read the `permissions.allow` patterns of a JSON settings file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn read_settings_patterns(path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        let settings: SettingsFile = serde_json::from_str(&content)?;
        Ok(settings.permissions.allow)
    }

    /// Append entries
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// First entry covering the invocation
    #[must_use]
    pub fn find(&self, tool_name: &str, command: Option<&str>) -> Option<&AllowlistEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(tool_name, command))
    }

    /// Entries covering every top-level segment of a shell command
    ///
    /// A blanket entry for the tool covers the whole command. Otherwise each
    /// segment must be covered by some entry on its own; returns `None` if
    /// any segment is not, or if the command is blank.
    #[must_use]
    pub fn cover_command(&self, tool_name: &str, command: &str) -> Option<Vec<&AllowlistEntry>> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.command == CommandMatch::Any && entry.matches_tool(tool_name))
        {
            return Some(vec![entry]);
        }

        let segments = split_segments(command);
        if segments.is_empty() {
            return None;
        }

        let mut covering: Vec<&AllowlistEntry> = Vec::new();
        for segment in segments {
            let entry = self.find(tool_name, Some(segment))?;
            if !covering.contains(&entry) {
                covering.push(entry);
            }
        }
        Some(covering)
    }

    #[must_use]
    pub fn entries(&self) -> &[AllowlistEntry] {
        &self.entries
    }
}
