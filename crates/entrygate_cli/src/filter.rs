//! `entrygate filter`: drops unchanged entries from a requested entry map.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use entrygate_common::EntryName;
use entrygate_config::CacheConfig;
use entrygate_plugin::{BuildDecision, CacheHooks};
use serde_json::{Map, Value};

use crate::{settings, FilterArgs, GlobalArgs};

/// The reduced entry map and the exit code the host should use.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Entries that still need building, with their original config values.
    pub entries: Map<String, Value>,
    /// Process exit code.
    pub code: i32,
}

/// Runs the `entrygate filter` command.
pub fn run(args: &FilterArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::resolve(global)?;
    let input = read_input(&args.entries)?;
    let outcome = apply(config, &input, global.quiet)?;

    let rendered = serde_json::to_string_pretty(&outcome.entries)?;
    match args.output {
        Some(ref path) => fs::write(path, rendered + "\n")?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(outcome.code)
}

/// Filters the JSON entry object in `input` against the cache.
pub fn apply(
    config: CacheConfig,
    input: &str,
    quiet: bool,
) -> Result<FilterOutcome, Box<dyn std::error::Error>> {
    let mut entries = parse_entries(input)?;
    let mut hooks = CacheHooks::from_config(config)?;

    let code = match hooks.before_build(&mut entries) {
        BuildDecision::Exit { code } => {
            if !quiet {
                eprintln!("No entries required building...");
            }
            code
        }
        BuildDecision::Proceed(report) => {
            if !quiet {
                let names: Vec<&str> = report.to_build.iter().map(EntryName::as_str).collect();
                eprintln!("Building the following entries [{}]", names.join(", "));
            }
            0
        }
    };

    let entries = entries
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();
    Ok(FilterOutcome { entries, code })
}

fn parse_entries(input: &str) -> Result<BTreeMap<EntryName, Value>, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(input)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, value)| (EntryName::new(name), value))
            .collect()),
        other => Err(format!("entries must be a JSON object, got {}", kind(&other)).into()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrygate_store::{CacheRecord, Fingerprint};

    const ENTRIES: &str = r#"{ "main": "./src/main.js", "admin": { "import": "./src/admin.js" } }"#;

    #[test]
    fn disabled_cache_passes_everything_through() {
        let outcome = apply(CacheConfig::disabled(), ENTRIES, true).unwrap();
        assert_eq!(outcome.code, 0);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.entries["admin"]["import"], "./src/admin.js");
    }

    #[test]
    fn empty_cache_keeps_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = apply(CacheConfig::enabled(dir.path()), ENTRIES, true).unwrap();
        assert_eq!(outcome.entries.len(), 2);
    }

    #[test]
    fn unchanged_entries_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("main.js");
        fs::write(&src, "console.log(1)").unwrap();
        let config = CacheConfig::enabled(dir.path().join("cache"));
        let store_dir = config.store_dir().unwrap();
        fs::create_dir_all(&store_dir).unwrap();
        CacheRecord::new(
            EntryName::new("main"),
            Fingerprint::capture(&[src], Some("h".to_string())),
        )
        .save(&store_dir)
        .unwrap();

        let outcome = apply(config.clone(), ENTRIES, true).unwrap();
        assert_eq!(outcome.code, 0);
        assert_eq!(outcome.entries.keys().collect::<Vec<_>>(), vec!["admin"]);

        let only_main = r#"{ "main": "./src/main.js" }"#;
        let outcome = apply(config, only_main, true).unwrap();
        assert_eq!(outcome.code, 0);
        assert!(outcome.entries.is_empty());
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = apply(CacheConfig::disabled(), "[1, 2]", true).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(apply(CacheConfig::disabled(), "{ nope", true).is_err());
    }
}
