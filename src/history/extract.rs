//! Command extraction: at most one command candidate per entry.

use std::rc::Rc;

use jiff::Timestamp;
use serde_json::Value;

use crate::model::{Block, Candidate, CommandSource, Content, RawEntry, Turn};

/// Tool names recognised as shell execution when nothing else is configured.
pub const DEFAULT_SHELL_TOOLS: &[&str] = &["Bash"];

/// Marker that starts a user-typed shell command.
const BANG: &str = "! ";

/// Turns decoded entries into command candidates.
#[derive(Debug, Clone)]
pub struct Extractor {
    shell_tools: Rc<[String]>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL_TOOLS.iter().map(ToString::to_string))
    }
}

impl Extractor {
    pub fn new(shell_tools: impl IntoIterator<Item = String>) -> Self {
        Self {
            shell_tools: shell_tools.into_iter().collect(),
        }
    }

    /// Extract the command an entry carries, if any.
    ///
    /// Entries without a timestamp are stamped with the current time.
    pub fn extract(&self, entry: &RawEntry) -> Option<Candidate> {
        match entry {
            RawEntry::Assistant(turn) => self.from_assistant(turn),
            RawEntry::User(turn) => from_user(turn),
            RawEntry::Other => None,
        }
    }

    fn is_shell_tool(&self, name: &str) -> bool {
        self.shell_tools.iter().any(|t| t == name)
    }

    /// Only the first shell invocation in an assistant turn counts.
    fn from_assistant(&self, turn: &Turn) -> Option<Candidate> {
        let Content::Blocks(blocks) = &turn.message.content else {
            return None;
        };
        let (id, input) = blocks.iter().find_map(|block| match block {
            Block::ToolUse { id, name, input } if self.is_shell_tool(name) => Some((id, input)),
            _ => None,
        })?;

        let command = normalize_command(input.get("command").and_then(Value::as_str)?);
        if command.is_empty() {
            return None;
        }
        let description = input
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        Some(Candidate {
            invocation_id: id.clone(),
            timestamp: turn.timestamp_or(Timestamp::now()),
            command,
            source: CommandSource::AssistantIssued,
            project: turn.cwd.clone(),
            description,
        })
    }
}

/// A user bang-command: the first line of plain text starting with `! `.
fn from_user(turn: &Turn) -> Option<Candidate> {
    let Content::Text(text) = &turn.message.content else {
        return None;
    };
    let command = text
        .lines()
        .find_map(|line| line.strip_prefix(BANG))?
        .trim();
    if command.is_empty() {
        return None;
    }

    Some(Candidate {
        invocation_id: None,
        timestamp: turn.timestamp_or(Timestamp::now()),
        command: command.to_string(),
        source: CommandSource::UserIssued,
        project: turn.cwd.clone(),
        description: None,
    })
}

/// Normalize command text for single-line display.
///
/// Lines are trimmed, blank lines dropped, and the rest joined with a
/// literal `\n` (backslash, n).
pub fn normalize_command(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\\n")
}
