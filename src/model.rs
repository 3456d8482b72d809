//! Pre-trained price models. Every model maps an aligned feature row to a
//! predicted natural log of the price in rupees.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::Artifacts;
use crate::encoder::FeatureRow;
use crate::error::{ReisError, Result};

pub trait PriceModel {
    /// Predicted `ln(price)` for one row.
    fn predict_log_price(&self, row: &FeatureRow) -> Result<f64>;

    fn kind(&self) -> &'static str;
}

/// On-disk form of a linear model: intercept plus one weight per schema column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelFile {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

/// Linear model whose weights are laid out in schema order.
#[derive(Debug, Clone)]
pub struct LinearModel {
    intercept: f64,
    columns: Arc<[String]>,
    weights: Vec<f64>,
}

impl LinearModel {
    /// Bind coefficients to the schema. Columns without a coefficient weigh zero;
    /// a coefficient for a column outside the schema is rejected.
    pub fn bind(file: LinearModelFile, schema: &Arc<[String]>) -> Result<Self> {
        if let Some(unknown) = file
            .coefficients
            .keys()
            .find(|col| !schema.iter().any(|s| s == *col))
        {
            return Err(ReisError::Model(format!(
                "coefficient for '{unknown}' which is not in the feature schema"
            )));
        }

        let weights = schema
            .iter()
            .map(|col| file.coefficients.get(col).copied().unwrap_or(0.0))
            .collect();
        Ok(Self {
            intercept: file.intercept,
            columns: Arc::clone(schema),
            weights,
        })
    }

    pub fn load(path: impl AsRef<Path>, schema: &Arc<[String]>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let file: LinearModelFile = serde_json::from_slice(&bytes)?;
        Self::bind(file, schema)
    }
}

impl PriceModel for LinearModel {
    fn predict_log_price(&self, row: &FeatureRow) -> Result<f64> {
        if row.columns() != &self.columns[..] {
            return Err(ReisError::Model(
                "feature row does not match the model schema".to_string(),
            ));
        }
        let dot: f64 = self
            .weights
            .iter()
            .zip(row.values())
            .map(|(w, v)| w * v)
            .sum();
        Ok(self.intercept + dot)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

#[cfg(feature = "xgboost")]
pub use self::booster::XgbModel;

#[cfg(feature = "xgboost")]
mod booster {
    use std::path::Path;

    use xgboost::{Booster, DMatrix};

    use super::PriceModel;
    use crate::encoder::FeatureRow;
    use crate::error::{ReisError, Result};

    /// Saved XGBoost booster trained on the same schema.
    pub struct XgbModel {
        booster: Booster,
        n_features: usize,
    }

    impl XgbModel {
        pub fn load(path: impl AsRef<Path>, n_features: usize) -> Result<Self> {
            let booster =
                Booster::load(path.as_ref()).map_err(|e| ReisError::Model(e.to_string()))?;
            Ok(Self {
                booster,
                n_features,
            })
        }
    }

    impl PriceModel for XgbModel {
        fn predict_log_price(&self, row: &FeatureRow) -> Result<f64> {
            if row.len() != self.n_features {
                return Err(ReisError::Model(format!(
                    "expected {} features, got {}",
                    self.n_features,
                    row.len()
                )));
            }
            // xgboost works on row-major f32 matrices
            let data: Vec<f32> = row.values().iter().map(|v| *v as f32).collect();
            let dmatrix =
                DMatrix::from_dense(&data, 1).map_err(|e| ReisError::Model(e.to_string()))?;
            let preds = self
                .booster
                .predict(&dmatrix)
                .map_err(|e| ReisError::Model(e.to_string()))?;
            preds
                .first()
                .map(|p| f64::from(*p))
                .ok_or_else(|| ReisError::Model("booster returned no prediction".to_string()))
        }

        fn kind(&self) -> &'static str {
            "xgboost"
        }
    }
}

/// Load the model artifact at `path`. `.json` files are linear models; anything
/// else is treated as a saved XGBoost booster.
pub fn load_model(path: impl AsRef<Path>, artifacts: &Artifacts) -> Result<Box<dyn PriceModel>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let model: Box<dyn PriceModel> = if is_json {
        Box::new(LinearModel::load(path, artifacts.feature_columns())?)
    } else {
        load_booster(path, artifacts)?
    };
    info!(path = %path.display(), kind = model.kind(), "loaded price model");
    Ok(model)
}

#[cfg(feature = "xgboost")]
fn load_booster(path: &Path, artifacts: &Artifacts) -> Result<Box<dyn PriceModel>> {
    Ok(Box::new(XgbModel::load(
        path,
        artifacts.feature_columns().len(),
    )?))
}

#[cfg(not(feature = "xgboost"))]
fn load_booster(path: &Path, _artifacts: &Artifacts) -> Result<Box<dyn PriceModel>> {
    Err(ReisError::Model(format!(
        "{} is not a JSON model and xgboost support is not compiled in",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{FeatureEncoder, PredictionRequest};

    fn artifacts() -> Artifacts {
        Artifacts::new(
            vec!["adyar".to_string(), "other".to_string()],
            ["area_sqft", "no_of_bedrooms", "loc_adyar", "loc_other"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn coefficients(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn linear_prediction_is_intercept_plus_dot_product() {
        let artifacts = artifacts();
        let model = LinearModel::bind(
            LinearModelFile {
                intercept: 10.0,
                coefficients: coefficients(&[("area_sqft", 0.001), ("loc_adyar", 0.5)]),
            },
            artifacts.feature_columns(),
        )
        .unwrap();

        let row = FeatureEncoder::new(artifacts)
            .encode(&PredictionRequest {
                location: "Adyar".to_string(),
                area_sqft: 1000.0,
                resale: "new".to_string(),
                no_of_bedrooms: 3,
                amenities: vec![],
            })
            .unwrap();
        let log_price = model.predict_log_price(&row).unwrap();
        assert!((log_price - 11.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_coefficient_outside_schema() {
        let artifacts = artifacts();
        let err = LinearModel::bind(
            LinearModelFile {
                intercept: 0.0,
                coefficients: coefficients(&[("loc_mylapore", 1.0)]),
            },
            artifacts.feature_columns(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("loc_mylapore"));
    }

    #[test]
    fn load_model_reads_linear_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reis_model.json");
        fs::write(
            &path,
            r#"{"intercept": 15.0, "coefficients": {"no_of_bedrooms": 0.1}}"#,
        )
        .unwrap();

        let model = load_model(&path, &artifacts()).unwrap();
        assert_eq!(model.kind(), "linear");
    }

    #[cfg(not(feature = "xgboost"))]
    #[test]
    fn booster_files_need_the_xgboost_feature() {
        let err = load_model("model.bin", &artifacts()).err().unwrap();
        assert!(matches!(err, ReisError::Model(_)));
    }
}
