//! Turns a raw prediction request into a feature row laid out exactly like the
//! model's training matrix.
//!
//! The encoder produces a small set of named fields (one location indicator per
//! vocabulary member, area, resale flag, bedrooms, amenity score) and then
//! reindexes them against the frozen schema: every schema column is present,
//! in schema order, and columns the encoder did not produce are zero.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::amenities::amenity_score;
use crate::artifacts::{normalize_label, Artifacts};
use crate::error::EncodeError;

pub const AREA_COLUMN: &str = "area_sqft";
pub const RESALE_COLUMN: &str = "resale";
pub const BEDROOMS_COLUMN: &str = "no_of_bedrooms";
pub const AMENITY_SCORE_COLUMN: &str = "amenity_score";

/// Column name of the indicator for a location group.
pub fn location_column(group: &str) -> String {
    format!("loc_{group}")
}

/// One property description as submitted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub location: String,
    pub area_sqft: f64,
    pub resale: String,
    pub no_of_bedrooms: i64,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Model-ready row. Columns are shared with the schema they were aligned to.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

pub struct FeatureEncoder {
    artifacts: Artifacts,
}

impl FeatureEncoder {
    pub fn new(artifacts: Artifacts) -> Self {
        let schema = artifacts.feature_columns();
        // produced fields the schema does not know about are dropped by alignment
        let dropped: Vec<String> = produced_columns(artifacts.location_groups())
            .into_iter()
            .filter(|col| !schema.iter().any(|s| s == col))
            .collect();
        if !dropped.is_empty() {
            warn!(?dropped, "encoder columns missing from feature schema");
        }
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn encode(&self, request: &PredictionRequest) -> Result<FeatureRow, EncodeError> {
        let mut fields: HashMap<String, f64> = HashMap::new();

        fields.extend(self.encode_location(&request.location));
        fields.insert(AREA_COLUMN.to_string(), encode_area(request.area_sqft)?);
        fields.insert(RESALE_COLUMN.to_string(), encode_resale(&request.resale)?);
        fields.insert(
            BEDROOMS_COLUMN.to_string(),
            encode_bedrooms(request.no_of_bedrooms)?,
        );
        fields.insert(
            AMENITY_SCORE_COLUMN.to_string(),
            amenity_score(&request.amenities) as f64,
        );

        Ok(self.align(&fields))
    }

    /// One indicator per vocabulary member; exactly one of them is set.
    fn encode_location(&self, raw: &str) -> Vec<(String, f64)> {
        let resolved = self.artifacts.resolve_location(raw);
        self.artifacts
            .location_groups()
            .iter()
            .map(|group| {
                let hit = if *group == resolved { 1.0 } else { 0.0 };
                (location_column(group), hit)
            })
            .collect()
    }

    /// Reindex produced fields against the schema, filling gaps with zero.
    fn align(&self, fields: &HashMap<String, f64>) -> FeatureRow {
        let columns = Arc::clone(self.artifacts.feature_columns());
        let values = columns
            .iter()
            .map(|col| fields.get(col).copied().unwrap_or(0.0))
            .collect();
        FeatureRow { columns, values }
    }
}

/// Every column name the encoder can emit for this vocabulary.
pub fn produced_columns(location_groups: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = location_groups
        .iter()
        .map(|group| location_column(group))
        .collect();
    columns.extend(
        [AREA_COLUMN, RESALE_COLUMN, BEDROOMS_COLUMN, AMENITY_SCORE_COLUMN]
            .iter()
            .map(|c| c.to_string()),
    );
    columns
}

fn encode_area(area_sqft: f64) -> Result<f64, EncodeError> {
    // NaN fails this comparison too
    if !(area_sqft > 0.0) || !area_sqft.is_finite() {
        return Err(EncodeError::invalid(
            AREA_COLUMN,
            format!("area must be greater than 0, got {area_sqft}"),
        ));
    }
    Ok(area_sqft)
}

fn encode_resale(resale: &str) -> Result<f64, EncodeError> {
    match normalize_label(resale).as_str() {
        "new" => Ok(0.0),
        "old" => Ok(1.0),
        other => Err(EncodeError::invalid(
            RESALE_COLUMN,
            format!("resale must be 'new' or 'old', got '{other}'"),
        )),
    }
}

fn encode_bedrooms(bedrooms: i64) -> Result<f64, EncodeError> {
    if bedrooms < 1 {
        return Err(EncodeError::invalid(
            BEDROOMS_COLUMN,
            format!("number of bedrooms must be >= 1, got {bedrooms}"),
        ));
    }
    Ok(bedrooms as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> FeatureEncoder {
        let groups = ["adyar", "velachery", "other"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let columns = [
            "area_sqft",
            "no_of_bedrooms",
            "resale",
            "amenity_score",
            "loc_adyar",
            "loc_other",
            "loc_velachery",
            "age_years",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        FeatureEncoder::new(Artifacts::new(groups, columns).unwrap())
    }

    fn request(location: &str) -> PredictionRequest {
        PredictionRequest {
            location: location.to_string(),
            area_sqft: 1000.0,
            resale: "old".to_string(),
            no_of_bedrooms: 2,
            amenities: vec!["Gym".to_string(), "balcony".to_string()],
        }
    }

    #[test]
    fn row_follows_schema_order() {
        let row = encoder().encode(&request("Adyar")).unwrap();
        assert_eq!(
            row.columns(),
            &[
                "area_sqft",
                "no_of_bedrooms",
                "resale",
                "amenity_score",
                "loc_adyar",
                "loc_other",
                "loc_velachery",
                "age_years",
            ]
        );
        assert_eq!(row.values(), &[1000.0, 2.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn iter_pairs_columns_with_values() {
        let row = encoder().encode(&request("velachery")).unwrap();
        let pairs: Vec<(&str, f64)> = row.iter().collect();
        assert_eq!(pairs.len(), row.len());
        assert_eq!(pairs[0], ("area_sqft", 1000.0));
        assert_eq!(pairs[6], ("loc_velachery", 1.0));
    }

    #[test]
    fn schema_columns_not_produced_are_zero() {
        let row = encoder().encode(&request("velachery")).unwrap();
        assert_eq!(row.get("age_years"), Some(0.0));
        assert_eq!(row.get("loc_velachery"), Some(1.0));
    }

    #[test]
    fn unknown_location_sets_other_only() {
        let row = encoder().encode(&request("Mylapore")).unwrap();
        assert_eq!(row.get("loc_other"), Some(1.0));
        assert_eq!(row.get("loc_adyar"), Some(0.0));
        assert_eq!(row.get("loc_velachery"), Some(0.0));
    }

    #[test]
    fn rejects_invalid_fields() {
        let enc = encoder();

        let mut req = request("adyar");
        req.area_sqft = 0.0;
        assert_eq!(enc.encode(&req).unwrap_err().field(), AREA_COLUMN);

        req.area_sqft = -5.0;
        assert_eq!(enc.encode(&req).unwrap_err().field(), AREA_COLUMN);

        req.area_sqft = f64::NAN;
        assert_eq!(enc.encode(&req).unwrap_err().field(), AREA_COLUMN);

        let mut req = request("adyar");
        req.resale = "renovated".to_string();
        assert_eq!(enc.encode(&req).unwrap_err().field(), RESALE_COLUMN);

        let mut req = request("adyar");
        req.no_of_bedrooms = 0;
        assert_eq!(enc.encode(&req).unwrap_err().field(), BEDROOMS_COLUMN);
    }

    #[test]
    fn resale_is_normalized() {
        let mut req = request("adyar");
        req.resale = " NEW ".to_string();
        let row = encoder().encode(&req).unwrap();
        assert_eq!(row.get("resale"), Some(0.0));
    }

    #[test]
    fn request_amenities_default_to_empty() {
        let req: PredictionRequest = serde_json::from_str(
            r#"{"location":"adyar","area_sqft":900,"resale":"new","no_of_bedrooms":1}"#,
        )
        .unwrap();
        assert!(req.amenities.is_empty());
        let row = encoder().encode(&req).unwrap();
        assert_eq!(row.get("amenity_score"), Some(0.0));
    }
}
