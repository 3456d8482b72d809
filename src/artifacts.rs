//! Frozen schema artifacts produced at training time.
//!
//! Both files are plain JSON arrays of strings. They are read once at process
//! start and handed to the encoder; nothing mutates them afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::encoder::location_column;
use crate::error::{ReisError, Result};

pub const LOCATION_GROUPS_FILE: &str = "location_grouped_values.json";
pub const FEATURE_COLUMNS_FILE: &str = "final_feature_columns.json";

/// Catch-all group for locations outside the vocabulary.
pub const OTHER_LOCATION: &str = "other";

/// Trim and lowercase a user supplied label.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Location group vocabulary plus the ordered feature schema the model was trained on.
#[derive(Debug, Clone)]
pub struct Artifacts {
    location_groups: Vec<String>,
    feature_columns: Arc<[String]>,
}

impl Artifacts {
    pub fn new(location_groups: Vec<String>, feature_columns: Vec<String>) -> Result<Self> {
        // entries are compared verbatim with normalized input
        let mut seen = HashSet::new();
        for loc in &location_groups {
            if loc.is_empty() || *loc != normalize_label(loc) {
                return Err(ReisError::Artifact(format!(
                    "location group '{loc}' is not trimmed lowercase text"
                )));
            }
            if !seen.insert(loc.as_str()) {
                return Err(ReisError::Artifact(format!(
                    "location group '{loc}' is listed twice"
                )));
            }
        }

        if location_groups.is_empty() {
            return Err(ReisError::Artifact(
                "location group vocabulary is empty".to_string(),
            ));
        }
        if !seen.contains(OTHER_LOCATION) {
            return Err(ReisError::Artifact(format!(
                "location group vocabulary has no '{OTHER_LOCATION}' group"
            )));
        }

        if feature_columns.is_empty() {
            return Err(ReisError::Artifact("feature schema is empty".to_string()));
        }
        let mut columns = HashSet::new();
        for col in &feature_columns {
            if !columns.insert(col.as_str()) {
                return Err(ReisError::Artifact(format!(
                    "feature schema lists column '{col}' twice"
                )));
            }
        }

        // every group needs its indicator column or the row loses its location
        let missing: Vec<String> = location_groups
            .iter()
            .map(|loc| location_column(loc))
            .filter(|col| !columns.contains(col.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(ReisError::Artifact(format!(
                "feature schema has no indicator columns {missing:?}"
            )));
        }

        Ok(Self {
            location_groups,
            feature_columns: feature_columns.into(),
        })
    }

    /// Read both artifact files from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let location_groups: Vec<String> = read_json(&dir.join(LOCATION_GROUPS_FILE))?;
        let feature_columns: Vec<String> = read_json(&dir.join(FEATURE_COLUMNS_FILE))?;

        let artifacts = Self::new(location_groups, feature_columns)?;
        info!(
            dir = %dir.display(),
            locations = artifacts.location_groups.len(),
            columns = artifacts.feature_columns.len(),
            "loaded schema artifacts"
        );
        Ok(artifacts)
    }

    /// Write both artifact files into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(LOCATION_GROUPS_FILE),
            serde_json::to_string_pretty(&self.location_groups)?,
        )?;
        fs::write(
            dir.join(FEATURE_COLUMNS_FILE),
            serde_json::to_string_pretty(&self.feature_columns[..])?,
        )?;
        debug!(dir = %dir.display(), "wrote schema artifacts");
        Ok(())
    }

    pub fn location_groups(&self) -> &[String] {
        &self.location_groups
    }

    pub fn feature_columns(&self) -> &Arc<[String]> {
        &self.feature_columns
    }

    pub fn has_location(&self, normalized: &str) -> bool {
        self.location_groups.iter().any(|loc| loc == normalized)
    }

    /// Map a raw location to its vocabulary member, falling back to "other".
    pub fn resolve_location(&self, raw: &str) -> String {
        let location = normalize_label(raw);
        if self.has_location(&location) {
            location
        } else {
            OTHER_LOCATION.to_string()
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .map_err(|e| ReisError::Artifact(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_slice(&bytes)?)
}
