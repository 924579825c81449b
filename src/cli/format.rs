//! Output formatting for CLI display.

use crate::model::Command;

/// Format a command as a numbered history line.
///
/// With `show_project`, the project's last path component is shown in
/// brackets before the command (`?` when unknown).
pub(super) fn format_line(number: usize, command: &Command, show_project: bool) -> String {
    if show_project {
        let project = command.project_name().unwrap_or_else(|| "?".to_string());
        format!("{number:>5}  [{project}] {}", command.command)
    } else {
        format!("{number:>5}  {}", command.command)
    }
}

/// Format a command as a single JSON object.
pub(super) fn format_json(command: &Command) -> Result<String, String> {
    serde_json::to_string(command).map_err(|e| format!("failed to serialize command: {e}"))
}
