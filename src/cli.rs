//! CLI interface for cchistory.
//!
//! Prints the shell commands run in Claude Code sessions, oldest first, in
//! the style of shell `history`:
//!
//! - `cchistory`: the project for the current directory.
//! - `cchistory <project>`: a project by path, directory name, or fragment.
//! - `cchistory --global`: every project, merged chronologically.
//! - `cchistory --list-projects`: the known project directories.

mod format;

use std::{
    convert::Infallible,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Parser;

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::history::{self, Extractor, ProjectStream};
use crate::model::Command;
use crate::projects;

use format::{format_json, format_line};

/// cchistory: shell history from Claude Code transcripts.
#[derive(Debug, Parser)]
#[command(name = "cchistory", version, after_long_help = EXAMPLES_HELP)]
pub struct Cli {
    /// Project to show: a path, a project directory name, or a fragment of
    /// one. Defaults to the current directory.
    project: Option<String>,

    /// Show commands from every project, merged chronologically.
    #[arg(long, short = 'g', conflicts_with = "project")]
    global: bool,

    /// List project directories instead of commands.
    #[arg(long, conflicts_with_all = ["project", "global"])]
    list_projects: bool,

    /// Include commands whose tool reported an error.
    #[arg(long)]
    include_failed: bool,

    /// Stop after this many commands.
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Print one JSON object per command.
    #[arg(long)]
    json: bool,

    /// Collect and sort everything before printing instead of streaming.
    #[arg(long)]
    batch: bool,

    /// Directory holding one subdirectory per project
    /// (default: `~/.claude/projects`).
    #[arg(long, value_name = "DIR")]
    projects_dir: Option<PathBuf>,
}

const EXAMPLES_HELP: &str = r"Examples:
  cchistory                      commands run in the current project
  cchistory ~/src/widget         commands run in a project by path
  cchistory widget -n 20         first 20 commands of any project ending in 'widget'
  cchistory --global | grep git  every project, oldest first
  cchistory --global --json      machine-readable output

Logging:
  CCHISTORY_LOG=debug cchistory  show which transcripts are read";

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();
    let root = config.projects_root(cli.projects_dir.as_deref())?;

    if cli.list_projects {
        return cmd_list_projects(&root);
    }

    let diagnostics = Diagnostics::new();
    let extractor = Extractor::new(config.shell_tools.iter().cloned());

    let resolved = if cli.global {
        projects::list_projects(&root).map(|all| all.into_iter().map(|p| p.path).collect())
    } else if let Some(reference) = cli.project.as_deref() {
        projects::resolve_project(&root, reference)
    } else {
        projects::resolve_current(&root)
    };
    let dirs: Vec<PathBuf> = resolved.map_err(|e| e.to_string())?;

    let options = PrintOptions {
        include_failed: cli.include_failed || config.include_failed,
        limit: cli.limit,
        json: cli.json,
        show_project: cli.global || dirs.len() > 1,
    };

    let sources: Vec<_> = dirs
        .iter()
        .map(|dir| {
            ProjectStream::open(dir, extractor.clone(), diagnostics.clone())
                .map(Ok::<Command, Infallible>)
        })
        .collect();

    if cli.batch {
        let sorted = history::sort_all(sources, &diagnostics);
        let commands = history::batches(sorted, history::BATCH_SIZE).flatten();
        print_commands(commands, &options)
    } else {
        print_commands(history::merge(sources, diagnostics), &options)
    }
}

fn cmd_list_projects(root: &Path) -> Result<(), String> {
    let projects = projects::list_projects(root).map_err(|e| e.to_string())?;

    let mut out = BufWriter::new(io::stdout().lock());
    for project in &projects {
        if !write_line(&mut out, &project.name)? {
            return Ok(());
        }
    }
    finish(&mut out)
}

struct PrintOptions {
    include_failed: bool,
    limit: Option<usize>,
    json: bool,
    show_project: bool,
}

/// Print commands as they are pulled, stopping early at the limit or when
/// the reader goes away.
fn print_commands(
    commands: impl Iterator<Item = Command>,
    options: &PrintOptions,
) -> Result<(), String> {
    let mut out = BufWriter::new(io::stdout().lock());
    write_commands(&mut out, commands, options)?;
    finish(&mut out)
}

fn write_commands(
    out: &mut impl Write,
    commands: impl Iterator<Item = Command>,
    options: &PrintOptions,
) -> Result<(), String> {
    let visible = commands.filter(|c| options.include_failed || c.success);
    let limited = visible.take(options.limit.unwrap_or(usize::MAX));

    for (i, command) in limited.enumerate() {
        let line = if options.json {
            format_json(&command)?
        } else {
            format_line(i + 1, &command, options.show_project)
        };
        if !write_line(out, &line)? {
            break;
        }
    }
    Ok(())
}

/// Write one line. Returns `Ok(false)` if the reader has closed the pipe.
fn write_line(out: &mut impl Write, line: &str) -> Result<bool, String> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(e) => Err(format!("failed to write output: {e}")),
    }
}

fn finish(out: &mut impl Write) -> Result<(), String> {
    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(format!("failed to write output: {e}"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;
    use jiff::Timestamp;

    use crate::model::CommandSource;

    fn command(name: &str, success: bool) -> Command {
        Command {
            timestamp: Timestamp::new(1_700_000_000, 0).unwrap(),
            command: name.into(),
            source: CommandSource::AssistantIssued,
            project: Some(PathBuf::from("/work/widget")),
            description: None,
            success,
        }
    }

    fn options() -> PrintOptions {
        PrintOptions {
            include_failed: false,
            limit: None,
            json: false,
            show_project: false,
        }
    }

    fn render(commands: Vec<Command>, options: &PrintOptions) -> String {
        let mut out = Vec::new();
        write_commands(&mut out, commands.into_iter(), options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_conflicts_with_project() {
        assert!(Cli::try_parse_from(["cchistory", "widget", "--global"]).is_err());
        assert!(Cli::try_parse_from(["cchistory", "--list-projects", "--global"]).is_err());
        assert!(Cli::try_parse_from(["cchistory", "-g", "-n", "5"]).is_ok());
    }

    #[test]
    fn hides_failed_commands_by_default() {
        let out = render(
            vec![command("ok", true), command("bad", false), command("fine", true)],
            &options(),
        );
        assert_eq!(out, "    1  ok\n    2  fine\n");
    }

    #[test]
    fn include_failed_shows_everything() {
        let options = PrintOptions {
            include_failed: true,
            ..options()
        };
        let out = render(vec![command("ok", true), command("bad", false)], &options);
        assert_eq!(out, "    1  ok\n    2  bad\n");
    }

    #[test]
    fn limit_stops_pulling() {
        let pulled = std::cell::Cell::new(0);
        let commands = (0..).map(|i| {
            pulled.set(pulled.get() + 1);
            command(&format!("c{i}"), true)
        });
        let options = PrintOptions {
            limit: Some(3),
            ..options()
        };

        let mut out = Vec::new();
        write_commands(&mut out, commands, &options).unwrap();

        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn json_output() {
        let options = PrintOptions {
            json: true,
            ..options()
        };
        let out = render(vec![command("ls", true)], &options);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["command"], "ls");
    }

    /// A writer whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn broken_pipe_ends_quietly() {
        let commands = vec![command("a", true), command("b", true)].into_iter();
        assert!(write_commands(&mut ClosedPipe, commands, &options()).is_ok());
        assert!(finish(&mut ClosedPipe).is_ok());
    }
}
