//! Project streams: every transcript of a project, oldest session first.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
    vec,
};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::Command;

use super::{Extractor, FileStream, HistoryError, Result};

/// Transcript files in a project directory, ordered by modification time.
///
/// Files whose metadata cannot be read are reported and left out. Equal
/// modification times fall back to path order.
pub fn list_transcripts(dir: &Path, diagnostics: &Diagnostics) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| HistoryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| HistoryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }

        let modified = entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        });
        match modified {
            Ok(Some(modified)) => files.push((modified, path)),
            Ok(None) => {}
            Err(e) => diagnostics.report(Diagnostic::Read {
                path,
                error: e.to_string(),
            }),
        }
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// The commands of one project: its transcripts concatenated in
/// modification order.
///
/// Sessions are assumed not to overlap in time, so this is a concatenation
/// rather than a merge. Only one transcript is open at a time.
pub struct ProjectStream {
    files: vec::IntoIter<PathBuf>,
    current: Option<FileStream>,
    extractor: Extractor,
    diagnostics: Diagnostics,
}

impl ProjectStream {
    /// Stream a project directory.
    ///
    /// A directory that cannot be listed is reported and yields nothing.
    pub fn open(dir: &Path, extractor: Extractor, diagnostics: Diagnostics) -> Self {
        let files = match list_transcripts(dir, &diagnostics) {
            Ok(files) => files,
            Err(e) => {
                let error = match &e {
                    HistoryError::Io { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                diagnostics.report(Diagnostic::Project {
                    dir: dir.to_path_buf(),
                    error,
                });
                Vec::new()
            }
        };
        tracing::debug!(dir = %dir.display(), files = files.len(), "opened project");
        Self::from_files(files, extractor, diagnostics)
    }

    /// Stream an explicit, already-ordered list of transcripts.
    pub fn from_files(files: Vec<PathBuf>, extractor: Extractor, diagnostics: Diagnostics) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            extractor,
            diagnostics,
        }
    }
}

impl Iterator for ProjectStream {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        loop {
            if let Some(command) = self.current.as_mut().and_then(Iterator::next) {
                return Some(command);
            }
            let path = self.files.next()?;
            self.current = Some(FileStream::open(
                &path,
                self.extractor.clone(),
                self.diagnostics.clone(),
            ));
        }
    }
}
