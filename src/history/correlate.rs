//! Success correlation: pairing invocations with their results.
//!
//! Results arrive after their invocations but in no particular order, often
//! interleaved with unrelated entries. Invocations are held by id until a
//! result settles them, and whatever is still waiting when the transcript
//! ends is released as successful.

use std::collections::HashMap;

use crate::model::{Candidate, Command, RawEntry};

/// A command waiting for its result.
#[derive(Debug)]
struct PendingCommand {
    candidate: Candidate,
    /// Creation order, for a deterministic flush.
    seq: u64,
}

/// Per-transcript correlation state.
///
/// Owned by a single file stream and dropped with it.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: HashMap<String, PendingCommand>,
    next_seq: u64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands still waiting for a result.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Accept a freshly extracted candidate.
    ///
    /// Candidates without an invocation id have no result channel and are
    /// settled as successful straight away. Others are held until resolved.
    /// If the id is already waiting, the earlier command is released as
    /// successful so that neither is lost.
    pub fn accept(&mut self, mut candidate: Candidate) -> Option<Command> {
        let Some(id) = candidate.invocation_id.take() else {
            return Some(candidate.resolve(true));
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let displaced = self
            .pending
            .insert(id.clone(), PendingCommand { candidate, seq })?;
        tracing::debug!(id = %id, "invocation id reused before its result arrived");
        Some(displaced.candidate.resolve(true))
    }

    /// Settle the command waiting on `id`, if any.
    ///
    /// Unknown and already-settled ids are ignored.
    pub fn resolve(&mut self, id: &str, is_error: bool) -> Option<Command> {
        let pending = self.pending.remove(id)?;
        Some(pending.candidate.resolve(!is_error))
    }

    /// Settle every command a user entry carries results for, in the order
    /// the results appear.
    pub fn resolve_entry<'a>(
        &'a mut self,
        entry: &'a RawEntry,
    ) -> impl Iterator<Item = Command> + 'a {
        entry.tool_results().filter_map(|result| {
            let command = self.resolve(&result.tool_use_id, result.is_error)?;
            if !command.success {
                tracing::trace!(
                    command = %command.command,
                    output = %result.output_text().unwrap_or_default(),
                    "command failed"
                );
            }
            Some(command)
        })
    }

    /// Release everything still waiting, in creation order, as successful.
    pub fn flush(&mut self) -> Vec<Command> {
        let mut orphans: Vec<PendingCommand> = self.pending.drain().map(|(_, p)| p).collect();
        orphans.sort_by_key(|p| p.seq);
        orphans
            .into_iter()
            .map(|p| p.candidate.resolve(true))
            .collect()
    }
}
