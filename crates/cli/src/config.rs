//! Configuration helpers: path expansion and `key=value` metadata parsing

use anyhow::{bail, Result};
use filequeue_core::domain::Metadata;
use std::path::PathBuf;

pub const DEFAULT_STATE_PATH: &str = "~/.filequeue/queue.json";

/// Expand a leading `~` to the home directory
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Parse repeated `--meta key=value` flags
///
/// Values that parse as JSON keep their type (`retries=3` is a number);
/// anything else is stored as a string.
pub fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid metadata '{}': expected key=value", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid metadata '{}': empty key", pair);
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}
