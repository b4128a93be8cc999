//! Manifest-driven access to the shared JSON fixtures under `fixtures/`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    timelines: HashMap<String, TimelineEntry>,
}

/// A timeline fixture is an animation list, optionally paired with a references table
/// for `@name` substitution.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimelineEntry {
    Path(String),
    WithReferences { path: String, references: String },
}

impl TimelineEntry {
    fn path(&self) -> &str {
        match self {
            TimelineEntry::Path(path) => path,
            TimelineEntry::WithReferences { path, .. } => path,
        }
    }

    fn references(&self) -> Option<&str> {
        match self {
            TimelineEntry::Path(_) => None,
            TimelineEntry::WithReferences { references, .. } => Some(references),
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

pub mod timelines {
    use super::*;

    fn entry(name: &str) -> Result<&'static TimelineEntry> {
        MANIFEST
            .timelines
            .get(name)
            .ok_or_else(|| anyhow!("unknown timeline fixture '{name}'"))
    }

    /// Fixture names, sorted.
    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.timelines.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(entry(name)?.path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        load_json(entry(name)?.path())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(entry(name)?.path()))
    }

    pub fn references<T: DeserializeOwned>(name: &str) -> Result<Option<T>> {
        match entry(name)?.references() {
            Some(rel) => load_json(rel).map(Some),
            None => Ok(None),
        }
    }
}
