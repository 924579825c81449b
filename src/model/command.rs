//! Commands: the unit the history is made of.

use std::path::PathBuf;

use jiff::Timestamp;
use serde::Serialize;

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandSource {
    /// Run by the assistant through a shell tool.
    AssistantIssued,

    /// Typed by the user as a `! command` line.
    UserIssued,
}

/// An extracted command whose outcome is not yet known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Links an assistant invocation to its later result.
    /// User-issued commands never carry one.
    pub invocation_id: Option<String>,
    pub timestamp: Timestamp,
    pub command: String,
    pub source: CommandSource,
    pub project: Option<PathBuf>,
    pub description: Option<String>,
}

impl Candidate {
    /// Settle the outcome, producing the command that is emitted downstream.
    pub fn resolve(self, success: bool) -> Command {
        Command {
            timestamp: self.timestamp,
            command: self.command,
            source: self.source,
            project: self.project,
            description: self.description,
            success,
        }
    }
}

/// A resolved command, ready for display.
///
/// There is no unresolved state: a command only exists once its success
/// flag has been settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub timestamp: Timestamp,

    /// Normalized command text. Multi-line commands are joined with a
    /// literal `\n`.
    pub command: String,
    pub source: CommandSource,
    pub project: Option<PathBuf>,
    pub description: Option<String>,
    pub success: bool,
}

impl Command {
    /// Final path component of the project, for compact display.
    pub fn project_name(&self) -> Option<String> {
        self.project
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            invocation_id: Some("toolu_1".into()),
            timestamp: Timestamp::new(1_700_000_000, 0).unwrap(),
            command: "cargo build".into(),
            source: CommandSource::AssistantIssued,
            project: Some(PathBuf::from("/work/widget")),
            description: Some("Build the crate".into()),
        }
    }

    #[test]
    fn resolve_carries_fields_and_outcome() {
        let command = candidate().resolve(false);

        assert_eq!(command.command, "cargo build");
        assert_eq!(command.source, CommandSource::AssistantIssued);
        assert_eq!(command.description.as_deref(), Some("Build the crate"));
        assert!(!command.success);
    }

    #[test]
    fn project_name_is_last_component() {
        let command = candidate().resolve(true);
        assert_eq!(command.project_name().as_deref(), Some("widget"));

        let mut orphan = candidate().resolve(true);
        orphan.project = None;
        assert_eq!(orphan.project_name(), None);
    }

    #[test]
    fn source_serializes_kebab_case() {
        let json = serde_json::to_value(CommandSource::UserIssued).unwrap();
        assert_eq!(json, "user-issued");
        let json = serde_json::to_value(CommandSource::AssistantIssued).unwrap();
        assert_eq!(json, "assistant-issued");
    }
}
