//! History reconstruction: from transcript lines to one ordered command stream.
//!
//! The pipeline is pull-based from end to end:
//!
//! ```text
//! merge  <-  project stream  <-  file stream  <-  correlator / extractor / decoder
//! ```
//!
//! Each stage produces one command per pull and holds only what it needs to
//! produce the next one, so a consumer that stops early never pays for the
//! rest of the history.

mod correlate;
mod decode;
mod extract;
mod file;
mod merge;
mod project;

use std::{io, path::PathBuf};

pub use correlate::Correlator;
pub use decode::decode_line;
pub use extract::{DEFAULT_SHELL_TOOLS, Extractor};
pub use file::FileStream;
pub use merge::{BATCH_SIZE, batches, merge, sort_all};
pub use project::ProjectStream;

/// Errors surfaced to callers of the history pipeline.
///
/// Problems with individual lines or files never show up here; those go to
/// the diagnostic channel.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("projects directory not found: {}", .0.display())]
    ProjectsRootMissing(PathBuf),

    #[error("no project matching '{0}'")]
    ProjectNotFound(String),
}

pub type Result<T> = core::result::Result<T, HistoryError>;
