//! Transcript entries: one decoded JSON line.
//!
//! Only the fields the history needs are modelled. Everything else on a line
//! is ignored, so newer transcript versions keep decoding.

use std::path::PathBuf;

use jiff::Timestamp;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A single line of a transcript, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawEntry {
    /// A user turn: typed text or tool results.
    User(Turn),

    /// An assistant turn: text and tool invocations.
    Assistant(Turn),

    /// Summaries, system records, snapshots and anything added later.
    #[serde(other)]
    Other,
}

/// The envelope shared by user and assistant entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub timestamp: Option<String>,

    /// Working directory the session was running in.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub message: Message,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: Content,
}

/// `message.content` is either plain text or a sequence of blocks.
///
/// A block that does not decode becomes [`Block::Other`]; its siblings are
/// kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(#[serde(deserialize_with = "lenient_blocks")] Vec<Block>),
}

impl Default for Content {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

/// A content block, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// The assistant asked for a tool to run.
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },

    /// The outcome of an earlier tool invocation.
    ToolResult(ToolResult),

    /// Text, thinking, images, and anything malformed.
    #[serde(other)]
    Other,
}

fn lenient_blocks<'de, D>(deserializer: D) -> Result<Vec<Block>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| Block::deserialize(value).unwrap_or(Block::Other))
        .collect())
}

/// `null` reads as `false`.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolResult {
    /// The invocation this result answers.
    pub tool_use_id: String,

    #[serde(default, deserialize_with = "null_as_false")]
    pub is_error: bool,

    /// Tool output: a string or a list of text blocks.
    #[serde(default)]
    pub content: Option<Value>,
}

impl ToolResult {
    /// The textual output of the tool, if any.
    pub fn output_text(&self) -> Option<String> {
        match self.content.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(parts) => {
                let text: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect();
                (!text.is_empty()).then(|| text.join("\n"))
            }
            _ => None,
        }
    }
}

impl RawEntry {
    /// Tool results carried by a user entry, in block order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        let blocks: &[Block] = match self {
            Self::User(Turn {
                message:
                    Message {
                        content: Content::Blocks(blocks),
                    },
                ..
            }) => blocks,
            _ => &[],
        };
        blocks.iter().filter_map(|block| match block {
            Block::ToolResult(result) => Some(result),
            _ => None,
        })
    }
}

impl Turn {
    /// The entry's timestamp, or `fallback` when absent or unparseable.
    pub fn timestamp_or(&self, fallback: Timestamp) -> Timestamp {
        self.timestamp
            .as_deref()
            .and_then(|s| s.parse::<Timestamp>().ok())
            .unwrap_or(fallback)
    }
}
