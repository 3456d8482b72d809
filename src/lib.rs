pub mod amenities;
pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod insights;
pub mod model;
pub mod prepare;
pub mod service;

pub use artifacts::Artifacts;
pub use encoder::{FeatureEncoder, FeatureRow, PredictionRequest};
pub use error::{EncodeError, ReisError, Result};
pub use insights::{Insights, InsightsEngine};
pub use model::{load_model, LinearModel, PriceModel};
pub use service::{MarketPosition, PredictionResponse, PredictionService};
