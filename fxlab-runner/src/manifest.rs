//! Run manifest (JSON): what was read, how it was processed, what was written.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fxlab_core::ChangeFormula;
use serde::{Deserialize, Serialize};

use crate::config::{NamedWindow, SourceKind};

/// Current schema version for `manifest.json`.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,

    pub source: String,
    /// BLAKE3 hex digest of the source file bytes.
    pub source_hash: String,
    pub source_kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    pub formula: ChangeFormula,
    pub date_column: String,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub series: Vec<String>,
    #[serde(default)]
    pub windows: Vec<NamedWindow>,

    /// Output files, relative to the output directory, in write order.
    pub files: Vec<String>,
}

impl RunManifest {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize run manifest")
    }

    /// Parse a manifest, rejecting schema versions newer than this build.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(json).context("failed to deserialize run manifest")?;
        if manifest.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported manifest schema version {} (max supported: {})",
                manifest.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(manifest)
    }
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json = manifest.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write manifest to {}", path.display()))
}

pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RunManifest::from_json(&json)
}
