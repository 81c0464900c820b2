//! entrygate CLI: drives the incremental entry cache around a bundler run.
//!
//! `entrygate filter` reduces a requested entry map before the build,
//! `entrygate commit` records fingerprints from the compilation export after
//! it, and `status` / `clean` inspect and reset the cache.

#![warn(missing_docs)]

mod commit;
mod filter;
mod settings;
mod status;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// entrygate: skip bundler entries whose sources have not changed.
#[derive(Parser, Debug)]
#[command(name = "entrygate", version, about = "Incremental build entry cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `entrygate.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory, overriding the configuration file and `CACHE_DIR`.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the cache: filter passes every entry through, commit writes nothing.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove unchanged entries from a requested entry map.
    Filter(FilterArgs),
    /// Record fingerprints for the entries of a finished build.
    Commit(CommitArgs),
    /// Show whether each cached entry is still unchanged.
    Status,
    /// Delete every cached fingerprint.
    Clean,
}

/// Arguments for the `entrygate filter` subcommand.
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// JSON object of entry name to entry config (`-` for stdin).
    #[arg(long)]
    pub entries: PathBuf,

    /// Where to write the reduced object (default: stdout).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `entrygate commit` subcommand.
#[derive(Parser, Debug)]
pub struct CommitArgs {
    /// Compilation export produced by the host bundler.
    #[arg(long)]
    pub stats: PathBuf,

    /// Exit with status 1 when fingerprints cannot be persisted.
    #[arg(long)]
    pub strict: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
    /// Optional cache directory override.
    pub cache_dir: Option<PathBuf>,
    /// Whether `--no-cache` was given.
    pub no_cache: bool,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
        cache_dir: cli.cache_dir,
        no_cache: cli.no_cache,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Filter(ref args) => filter::run(args, &global),
        Command::Commit(ref args) => commit::run(args, &global),
        Command::Status => status::run(&global),
        Command::Clean => status::clean(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_tracing(global: &GlobalArgs) {
    let default_level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_filter() {
        let cli = Cli::parse_from(["entrygate", "filter", "--entries", "entries.json"]);
        match cli.command {
            Command::Filter(ref args) => {
                assert_eq!(args.entries, PathBuf::from("entries.json"));
                assert!(args.output.is_none());
            }
            _ => panic!("expected Filter command"),
        }
    }

    #[test]
    fn parse_filter_with_output() {
        let cli = Cli::parse_from([
            "entrygate",
            "filter",
            "--entries",
            "-",
            "-o",
            "reduced.json",
        ]);
        match cli.command {
            Command::Filter(ref args) => {
                assert_eq!(args.entries, PathBuf::from("-"));
                assert_eq!(args.output, Some(PathBuf::from("reduced.json")));
            }
            _ => panic!("expected Filter command"),
        }
    }

    #[test]
    fn parse_commit_strict() {
        let cli = Cli::parse_from(["entrygate", "commit", "--stats", "stats.json", "--strict"]);
        match cli.command {
            Command::Commit(ref args) => {
                assert_eq!(args.stats, PathBuf::from("stats.json"));
                assert!(args.strict);
            }
            _ => panic!("expected Commit command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "entrygate",
            "--quiet",
            "--cache-dir",
            "/tmp/cache",
            "--no-cache",
            "status",
        ]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert!(cli.no_cache);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["entrygate", "clean", "--verbose", "--config", "ci.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(matches!(cli.command, Command::Clean));
    }

    #[test]
    fn filter_requires_entries() {
        assert!(Cli::try_parse_from(["entrygate", "filter"]).is_err());
    }
}
