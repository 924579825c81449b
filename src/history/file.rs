//! File streams: the commands of one transcript, in transcript order.

use std::{
    collections::VecDeque,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::Command;

use super::{Correlator, Extractor, decode_line};

/// A lazy stream of resolved commands from one transcript.
///
/// Lines are read one at a time as commands are pulled. Malformed lines and
/// read errors are reported to the diagnostic channel, never returned.
pub struct FileStream<R = BufReader<File>> {
    path: PathBuf,
    lines: Option<io::Split<R>>,
    line_no: usize,
    extractor: Extractor,
    correlator: Correlator,
    ready: VecDeque<Command>,
    diagnostics: Diagnostics,
}

impl FileStream {
    /// Open a transcript file.
    ///
    /// A file that cannot be opened is reported and yields nothing.
    pub fn open(path: &Path, extractor: Extractor, diagnostics: Diagnostics) -> Self {
        match File::open(path) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), "reading transcript");
                Self::from_reader(path, BufReader::new(file), extractor, diagnostics)
            }
            Err(e) => {
                diagnostics.report(Diagnostic::Read {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                Self::with_lines(path.to_path_buf(), None, extractor, diagnostics)
            }
        }
    }
}

impl<R: BufRead> FileStream<R> {
    /// Stream commands from any line source. `path` labels diagnostics.
    pub fn from_reader(
        path: impl Into<PathBuf>,
        reader: R,
        extractor: Extractor,
        diagnostics: Diagnostics,
    ) -> Self {
        Self::with_lines(path.into(), Some(reader.split(b'\n')), extractor, diagnostics)
    }

    fn with_lines(
        path: PathBuf,
        lines: Option<io::Split<R>>,
        extractor: Extractor,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            path,
            lines,
            line_no: 0,
            extractor,
            correlator: Correlator::new(),
            ready: VecDeque::new(),
            diagnostics,
        }
    }

    /// Read one line and queue whatever it settles.
    ///
    /// Returns `false` once the source is exhausted.
    fn advance(&mut self) -> bool {
        let Some(lines) = self.lines.as_mut() else {
            return false;
        };

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                self.diagnostics.report(Diagnostic::Read {
                    path: self.path.clone(),
                    error: e.to_string(),
                });
                self.finish();
                return true;
            }
            None => {
                self.finish();
                return true;
            }
        };
        self.line_no += 1;

        let entry = match decode_line(&line) {
            Ok(Some(entry)) => entry,
            Ok(None) => return true,
            Err(e) => {
                self.diagnostics.report(Diagnostic::Decode {
                    path: self.path.clone(),
                    line: self.line_no,
                    class: e.classify(),
                });
                return true;
            }
        };

        self.ready.extend(self.correlator.resolve_entry(&entry));
        if let Some(candidate) = self.extractor.extract(&entry)
            && let Some(command) = self.correlator.accept(candidate)
        {
            self.ready.push_back(command);
        }
        true
    }

    /// Stop reading and release commands that never got a result.
    fn finish(&mut self) {
        self.lines = None;
        let pending = self.correlator.pending_len();
        if pending > 0 {
            tracing::trace!(
                path = %self.path.display(),
                count = pending,
                "releasing commands without results"
            );
        }
        self.ready.extend(self.correlator.flush());
    }
}

impl<R: BufRead> Iterator for FileStream<R> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        loop {
            if let Some(command) = self.ready.pop_front() {
                return Some(command);
            }
            if !self.advance() {
                return None;
            }
        }
    }
}
