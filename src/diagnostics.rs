//! The diagnostic channel.
//!
//! Malformed lines, unreadable files and failing merge sources never stop
//! the history from being shown. They are reported here, logged through
//! `tracing`, and the affected stream carries on or ends quietly.

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use serde_json::error::Category;

/// Something worth telling the user about that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A transcript line could not be decoded and was skipped.
    Decode {
        path: PathBuf,
        line: usize,
        class: Category,
    },

    /// A transcript file could not be opened or read to the end.
    Read { path: PathBuf, error: String },

    /// A project directory could not be listed.
    Project { dir: PathBuf, error: String },

    /// A merge source failed and was dropped from the merge.
    Source { index: usize, error: String },
}

/// Short name for a `serde_json` failure class.
pub fn class_name(class: Category) -> &'static str {
    match class {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    }
}

/// Handle to the diagnostic channel.
///
/// Cheap to clone; every stage of a pipeline holds its own copy.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    collected: Option<Rc<RefCell<Vec<Diagnostic>>>>,
}

impl Diagnostics {
    /// A channel that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that logs and also keeps every report for inspection.
    #[cfg(test)]
    pub fn collecting() -> Self {
        Self {
            collected: Some(Rc::default()),
        }
    }

    /// Everything reported so far (only populated by a collecting channel).
    #[cfg(test)]
    pub fn collected(&self) -> Vec<Diagnostic> {
        self.collected
            .as_ref()
            .map(|c| c.borrow().clone())
            .unwrap_or_default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Decode { path, line, class } => tracing::warn!(
                path = %path.display(),
                line,
                class = class_name(*class),
                "skipping malformed transcript line"
            ),
            Diagnostic::Read { path, error } => {
                tracing::warn!(path = %path.display(), %error, "failed to read transcript");
            }
            Diagnostic::Project { dir, error } => {
                tracing::warn!(dir = %dir.display(), %error, "failed to list project");
            }
            Diagnostic::Source { index, error } => {
                tracing::warn!(source = index, %error, "dropping failed history source");
            }
        }

        if let Some(collected) = &self.collected {
            collected.borrow_mut().push(diagnostic);
        }
    }
}
