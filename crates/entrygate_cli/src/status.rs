//! `entrygate status` and `entrygate clean`: inspect and reset the cache.

use std::io::{self, Write};

use entrygate_config::CacheConfig;
use entrygate_store::FsFingerprintStore;

use crate::{settings, GlobalArgs};

/// Runs the `entrygate status` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::resolve(global)?;
    let mut stdout = io::stdout().lock();
    write_status(&config, &mut stdout)?;
    Ok(0)
}

/// Writes one line per cached entry: name, state, and file count.
pub fn write_status(
    config: &CacheConfig,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(store) = store_for(config) else {
        writeln!(out, "cache disabled")?;
        return Ok(());
    };
    let records = store.records()?;
    if records.is_empty() {
        writeln!(out, "no cached entries in {}", store.dir().display())?;
        return Ok(());
    }
    for record in &records {
        let state = if record.fingerprint.is_current() {
            "unchanged"
        } else {
            "changed"
        };
        writeln!(
            out,
            "{:<24} {:<9} {} file(s)",
            record.name.as_str(),
            state,
            record.fingerprint.files.len()
        )?;
    }
    Ok(())
}

/// Runs the `entrygate clean` command.
pub fn clean(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::resolve(global)?;
    let removed = clear(&config)?;
    if !global.quiet {
        eprintln!("Removed {removed} cached entr{}", if removed == 1 { "y" } else { "ies" });
    }
    Ok(0)
}

/// Deletes every record of the configured store. A disabled cache removes nothing.
pub fn clear(config: &CacheConfig) -> Result<usize, Box<dyn std::error::Error>> {
    match store_for(config) {
        Some(store) => Ok(store.clear()?),
        None => Ok(0),
    }
}

/// Status and clean work on the directory even when filtering is disabled,
/// as long as one is configured.
fn store_for(config: &CacheConfig) -> Option<FsFingerprintStore> {
    config.store_dir().map(FsFingerprintStore::new)
}
