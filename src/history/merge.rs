//! Chronological merge of independently ordered command streams.
//!
//! The streaming merge keeps exactly one lookahead command per source, so
//! memory stays proportional to the number of sources no matter how long
//! each history is, and a consumer that stops after `k` commands causes at
//! most `k` pulls plus one per source.
//!
//! Ties on equal timestamps go to the source that comes first in input
//! order. Timestamps have millisecond resolution, so commands from
//! different projects can collide.

use std::{fmt, vec};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::Command;

/// Number of commands per batch in batch-sort mode.
pub const BATCH_SIZE: usize = 1024;

/// One source in the merge, with its lookahead.
struct Cursor<I> {
    index: usize,
    source: I,
    /// `None` once the source is exhausted or has failed.
    head: Option<Command>,
}

impl<I, E> Cursor<I>
where
    I: Iterator<Item = Result<Command, E>>,
    E: fmt::Display,
{
    /// Replace the lookahead with the source's next command.
    fn refill(&mut self, diagnostics: &Diagnostics) {
        self.head = pull(self.index, &mut self.source, diagnostics);
        if self.head.is_none() {
            tracing::trace!(source = self.index, "history source exhausted");
        }
    }
}

/// Pull one command, turning a failure into a diagnostic and exhaustion.
fn pull<I, E>(index: usize, source: &mut I, diagnostics: &Diagnostics) -> Option<Command>
where
    I: Iterator<Item = Result<Command, E>>,
    E: fmt::Display,
{
    match source.next()? {
        Ok(command) => Some(command),
        Err(e) => {
            diagnostics.report(Diagnostic::Source {
                index,
                error: e.to_string(),
            });
            None
        }
    }
}

enum State<I> {
    /// Nothing to merge.
    Empty,

    /// A single source, passed through without a lookahead.
    Single { source: I, done: bool },

    /// Several sources; cursors are primed on the first pull.
    Many {
        cursors: Vec<Cursor<I>>,
        primed: bool,
    },
}

/// A lazy, chronologically ordered merge of command streams.
///
/// Created by [`merge`].
pub struct Merge<I> {
    state: State<I>,
    diagnostics: Diagnostics,
}

/// Merge independently ordered command streams into one ordered stream.
///
/// Each source must already be ordered by timestamp. A source that yields an
/// error is reported and dropped; the other sources continue. Nothing is
/// pulled until the merge itself is pulled.
pub fn merge<S, I, E>(sources: S, diagnostics: Diagnostics) -> Merge<I>
where
    S: IntoIterator<Item = I>,
    I: Iterator<Item = Result<Command, E>>,
    E: fmt::Display,
{
    let mut sources: Vec<I> = sources.into_iter().collect();
    let state = match sources.len() {
        0 => State::Empty,
        1 => State::Single {
            source: sources.remove(0),
            done: false,
        },
        _ => State::Many {
            cursors: sources
                .into_iter()
                .enumerate()
                .map(|(index, source)| Cursor {
                    index,
                    source,
                    head: None,
                })
                .collect(),
            primed: false,
        },
    };
    Merge { state, diagnostics }
}

impl<I, E> Iterator for Merge<I>
where
    I: Iterator<Item = Result<Command, E>>,
    E: fmt::Display,
{
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        match &mut self.state {
            State::Empty => None,
            State::Single { source, done } => {
                if *done {
                    return None;
                }
                let next = pull(0, source, &self.diagnostics);
                *done = next.is_none();
                next
            }
            State::Many { cursors, primed } => {
                if !*primed {
                    for cursor in cursors.iter_mut() {
                        cursor.refill(&self.diagnostics);
                    }
                    *primed = true;
                }

                // Linear scan; strict `<` keeps the earliest source on ties.
                let mut earliest: Option<usize> = None;
                for (i, cursor) in cursors.iter().enumerate() {
                    let Some(head) = &cursor.head else { continue };
                    let earlier = earliest.is_none_or(|e| {
                        cursors[e]
                            .head
                            .as_ref()
                            .is_some_and(|best| head.timestamp < best.timestamp)
                    });
                    if earlier {
                        earliest = Some(i);
                    }
                }

                let cursor = &mut cursors[earliest?];
                let command = cursor.head.take();
                cursor.refill(&self.diagnostics);
                command
            }
        }
    }
}

/// Collect every source and sort once.
///
/// The batch alternative to [`merge`]: simpler, but holds the entire history
/// in memory. Equal timestamps keep source order, then in-source order.
pub fn sort_all<S, I, E>(sources: S, diagnostics: &Diagnostics) -> Vec<Command>
where
    S: IntoIterator<Item = I>,
    I: Iterator<Item = Result<Command, E>>,
    E: fmt::Display,
{
    let mut all = Vec::new();
    for (index, mut source) in sources.into_iter().enumerate() {
        while let Some(command) = pull(index, &mut source, diagnostics) {
            all.push(command);
        }
    }
    all.sort_by_key(|c| c.timestamp);
    all
}

/// Fixed-size batches over an already sorted history.
pub struct Batches {
    commands: vec::IntoIter<Command>,
    size: usize,
}

/// Split sorted commands into batches of `size` (at least one).
pub fn batches(commands: Vec<Command>, size: usize) -> Batches {
    Batches {
        commands: commands.into_iter(),
        size: size.max(1),
    }
}

impl Iterator for Batches {
    type Item = Vec<Command>;

    fn next(&mut self) -> Option<Vec<Command>> {
        let batch: Vec<Command> = self.commands.by_ref().take(self.size).collect();
        (!batch.is_empty()).then_some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::Cell, convert::Infallible, rc::Rc};

    use jiff::Timestamp;

    use crate::model::CommandSource;

    fn at(secs: i64, name: &str) -> Command {
        Command {
            timestamp: Timestamp::new(1_700_000_000 + secs, 0).unwrap(),
            command: name.to_string(),
            source: CommandSource::AssistantIssued,
            project: None,
            description: None,
            success: true,
        }
    }

    /// A source of commands at the given offsets, named `{tag}{offset}`.
    fn source(tag: &str, offsets: &[i64]) -> vec::IntoIter<Result<Command, Infallible>> {
        offsets
            .iter()
            .map(|&s| Ok(at(s, &format!("{tag}{s}"))))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn seconds(commands: &[Command]) -> Vec<i64> {
        commands
            .iter()
            .map(|c| c.timestamp.as_second() - 1_700_000_000)
            .collect()
    }

    #[test]
    fn merges_two_sources() {
        let merged: Vec<Command> = merge(
            [source("a", &[1, 3, 5]), source("b", &[2, 4, 6])],
            Diagnostics::new(),
        )
        .collect();
        assert_eq!(seconds(&merged), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn merges_three_sources() {
        let merged: Vec<Command> = merge(
            [
                source("a", &[1, 4]),
                source("b", &[2, 5]),
                source("c", &[3, 6]),
            ],
            Diagnostics::new(),
        )
        .collect();
        assert_eq!(seconds(&merged), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn no_sources_yield_nothing() {
        let sources: Vec<vec::IntoIter<Result<Command, Infallible>>> = Vec::new();
        assert_eq!(merge(sources, Diagnostics::new()).count(), 0);
    }

    #[test]
    fn single_source_passes_through_unchanged() {
        // Out of order on purpose: a lone source is not re-sorted.
        let merged: Vec<Command> = merge([source("a", &[3, 1, 2])], Diagnostics::new()).collect();
        assert_eq!(seconds(&merged), [3, 1, 2]);
    }

    #[test]
    fn uneven_and_empty_sources() {
        let merged: Vec<Command> = merge(
            [source("a", &[]), source("b", &[1, 2, 9]), source("c", &[5])],
            Diagnostics::new(),
        )
        .collect();
        assert_eq!(seconds(&merged), [1, 2, 5, 9]);
    }

    #[test]
    fn ties_go_to_the_earlier_source() {
        let merged: Vec<Command> = merge(
            [source("a", &[1, 2]), source("b", &[1, 2]), source("c", &[1])],
            Diagnostics::new(),
        )
        .collect();
        let names: Vec<&str> = merged.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(names, ["a1", "b1", "c1", "a2", "b2"]);
    }

    /// Counts how many times the wrapped source is pulled.
    struct Counting<I> {
        inner: I,
        pulls: Rc<Cell<usize>>,
    }

    impl<I: Iterator> Iterator for Counting<I> {
        type Item = I::Item;

        fn next(&mut self) -> Option<I::Item> {
            self.pulls.set(self.pulls.get() + 1);
            self.inner.next()
        }
    }

    fn endless(offset: i64, step: i64) -> impl Iterator<Item = Result<Command, Infallible>> {
        (0..).map(move |i| Ok(at(offset + i * step, "x")))
    }

    #[test]
    fn early_termination_bounds_pulls() {
        let counters: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::default()).collect();
        let sources: Vec<_> = counters
            .iter()
            .enumerate()
            .map(|(i, pulls)| Counting {
                inner: endless(i64::try_from(i).unwrap(), 3),
                pulls: Rc::clone(pulls),
            })
            .collect();

        let mut merge = merge(sources, Diagnostics::new());
        assert_eq!(counters.iter().map(|c| c.get()).sum::<usize>(), 0);

        let k = 10;
        let taken: Vec<Command> = merge.by_ref().take(k).collect();
        assert_eq!(seconds(&taken), (0..10).collect::<Vec<_>>());

        let total: usize = counters.iter().map(|c| c.get()).sum();
        assert!(total <= k + 3, "pulled {total} times");
        for counter in &counters {
            assert!(counter.get() <= k + 3);
        }
    }

    #[test]
    fn failing_source_is_dropped_and_reported() {
        let failing: vec::IntoIter<Result<Command, String>> =
            vec![Ok(at(1, "f1")), Err("stream broke".to_string()), Ok(at(9, "never"))].into_iter();
        let healthy: vec::IntoIter<Result<Command, String>> =
            vec![Ok(at(0, "h0")), Ok(at(2, "h2")), Ok(at(4, "h4"))].into_iter();
        let diagnostics = Diagnostics::collecting();

        let merged: Vec<Command> = merge([failing, healthy], diagnostics.clone()).collect();

        let names: Vec<&str> = merged.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(names, ["h0", "f1", "h2", "h4"]);
        assert_eq!(
            diagnostics.collected(),
            [Diagnostic::Source {
                index: 0,
                error: "stream broke".into(),
            }]
        );
    }

    #[test]
    fn source_failing_on_first_pull() {
        let broken: vec::IntoIter<Result<Command, String>> =
            vec![Err("unreadable".to_string())].into_iter();
        let healthy: vec::IntoIter<Result<Command, String>> = vec![Ok(at(0, "h0"))].into_iter();
        let diagnostics = Diagnostics::collecting();

        let merged: Vec<Command> = merge([broken, healthy], diagnostics.clone()).collect();

        assert_eq!(merged.len(), 1);
        assert_eq!(diagnostics.collected().len(), 1);
    }

    #[test]
    fn single_failing_source_stops() {
        let only: vec::IntoIter<Result<Command, String>> =
            vec![Ok(at(0, "a")), Err("boom".to_string()), Ok(at(1, "b"))].into_iter();
        let diagnostics = Diagnostics::collecting();

        let mut merged = merge([only], diagnostics.clone());
        assert_eq!(merged.next().unwrap().command, "a");
        assert!(merged.next().is_none());
        assert!(merged.next().is_none());
        assert_eq!(diagnostics.collected().len(), 1);
    }

    #[test]
    fn sort_all_matches_streaming_merge() {
        let sources = || {
            [
                source("a", &[1, 3, 5, 7]),
                source("b", &[1, 3, 4]),
                source("c", &[3, 6]),
            ]
        };

        let streamed: Vec<Command> = merge(sources(), Diagnostics::new()).collect();
        let sorted = sort_all(sources(), &Diagnostics::new());
        assert_eq!(streamed, sorted);

        let names: Vec<&str> = sorted.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(names, ["a1", "b1", "a3", "b3", "c3", "b4", "a5", "c6", "a7"]);
    }

    #[test]
    fn batches_are_fixed_size() {
        let commands = sort_all([source("a", &[1, 2, 3, 4, 5])], &Diagnostics::new());
        let sizes: Vec<usize> = batches(commands, 2).map(|b| b.len()).collect();
        assert_eq!(sizes, [2, 2, 1]);

        assert_eq!(batches(Vec::new(), BATCH_SIZE).count(), 0);
    }
}
