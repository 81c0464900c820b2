//! `entrygate commit`: records fingerprints for the entries a build produced.

use entrygate_config::CacheConfig;
use entrygate_graph::Compilation;
use entrygate_plugin::{CacheHooks, GateError};

use crate::{settings, CommitArgs, GlobalArgs};

/// Runs the `entrygate commit` command.
///
/// A malformed compilation export exits 1. A failed cache write is reported
/// and exits 0 so the build stands, unless `--strict` is given.
pub fn run(args: &CommitArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::resolve(global)?;
    let compilation = Compilation::load(&args.stats)?;
    apply(config, &compilation, args.strict, global.quiet)
}

/// Commits fingerprints for every entry point of `compilation`.
pub fn apply(
    config: CacheConfig,
    compilation: &Compilation,
    strict: bool,
    quiet: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut hooks = CacheHooks::from_config(config)?;
    match hooks.after_build(compilation) {
        Ok(report) => {
            if !quiet && hooks.gate().is_enabled() {
                eprintln!(
                    "Cached {} entr{} ({} deferred)",
                    report.written.len(),
                    if report.written.len() == 1 { "y" } else { "ies" },
                    report.deferred.len()
                );
            }
            Ok(0)
        }
        Err(GateError::Store(err)) => {
            eprintln!("warning: {err}");
            Ok(if strict { 1 } else { 0 })
        }
        Err(err) => Err(err.into()),
    }
}
