//! Core data model for cchistory.
//!
//! Raw transcript entries as they appear on disk, and the commands
//! reconstructed from them.

mod command;
mod entry;

pub use command::{Candidate, Command, CommandSource};
pub use entry::{Block, Content, RawEntry, Turn};
