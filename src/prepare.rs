//! Derives the schema artifacts from the reference dataset.
//!
//! The location vocabulary comes from the same rare-location rule the insights
//! engine applies, so artifacts written here always agree with the insights
//! groups computed from the same file.

use polars::prelude::DataFrame;
use tracing::info;

use crate::artifacts::{Artifacts, OTHER_LOCATION};
use crate::encoder::produced_columns;
use crate::error::Result;
use crate::insights::InsightsEngine;

pub fn derive_artifacts(reference: &DataFrame) -> Result<Artifacts> {
    let engine = InsightsEngine::new(reference)?;

    let mut location_groups: Vec<String> = engine.grouped_locations().iter().cloned().collect();
    // the encoder always needs a fallback column, even if no location was rare
    if !location_groups.iter().any(|loc| loc == OTHER_LOCATION) {
        location_groups.push(OTHER_LOCATION.to_string());
    }
    let feature_columns = produced_columns(&location_groups);

    info!(
        locations = location_groups.len(),
        columns = feature_columns.len(),
        "derived schema artifacts"
    );
    Artifacts::new(location_groups, feature_columns)
}
