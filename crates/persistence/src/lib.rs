#![deny(warnings)]

//! Save-game persistence: serde-generic codecs plus file helpers.
//!
//! Snapshots are plain serde values, so this crate stays agnostic of the
//! simulation types. JSON is the human-inspectable format used for saves
//! on disk; bincode is the compact format for anything latency-sensitive.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Encode a snapshot as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("serializing snapshot to JSON")
}

/// Decode a snapshot from JSON.
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).context("deserializing snapshot from JSON")
}

/// Encode a snapshot as compact bincode bytes.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).context("serializing snapshot to bincode")
}

/// Decode a snapshot from bincode bytes.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).context("deserializing snapshot from bincode")
}

/// Write a snapshot to `path` as JSON, creating parent directories.
pub fn save_to_path<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating save directory {}", parent.display()))?;
    }
    let text = to_json(value)?;
    fs::write(path, text).with_context(|| format!("writing save file {}", path.display()))?;
    tracing::info!(target: "persistence", path = %path.display(), "snapshot saved");
    Ok(())
}

/// Read a JSON snapshot back from `path`.
pub fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading save file {}", path.display()))?;
    let value = from_json(&text)?;
    tracing::info!(target: "persistence", path = %path.display(), "snapshot loaded");
    Ok(value)
}
