//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::artifacts::Artifacts;
use crate::encoder::PredictionRequest;

pub const DEFAULT_MODEL_FILE: &str = "reis_model.json";

#[derive(Parser, Debug)]
#[command(name = "reis", version, about = "Real estate price estimates and market insights")]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathsConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// Locations of the frozen inputs. Every flag falls back to an environment variable.
#[derive(Args, Debug, Clone)]
pub struct PathsConfig {
    /// Directory holding the schema artifacts
    #[arg(long, env = "REIS_ARTIFACTS_DIR", default_value = "artifacts", global = true)]
    pub artifacts_dir: PathBuf,

    /// Reference dataset CSV (location, price, area_sqft)
    #[arg(
        long,
        env = "REIS_DATASET",
        default_value = "cleaned_chennai_dataset.csv",
        global = true
    )]
    pub dataset: PathBuf,

    /// Price model file; defaults to reis_model.json in the artifacts directory
    #[arg(long, env = "REIS_MODEL", global = true)]
    pub model: Option<PathBuf>,
}

impl PathsConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model
            .clone()
            .unwrap_or_else(|| self.artifacts_dir.join(DEFAULT_MODEL_FILE))
    }

    pub fn load_artifacts(&self) -> crate::Result<Artifacts> {
        Artifacts::load(&self.artifacts_dir)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate the price of a property and show local market insights
    Predict {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show market insights for a location
    Insights {
        #[arg(long)]
        location: String,

        #[arg(long)]
        json: bool,
    },
    /// Derive the location vocabulary and feature schema from the dataset
    PrepareArtifacts {
        /// Output directory; defaults to the artifacts directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the reference dataset
    FetchDataset {
        #[arg(long)]
        url: String,

        /// Destination; defaults to the dataset path
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[arg(long)]
    pub location: String,

    /// Built-up area in square feet
    #[arg(long, allow_negative_numbers = true)]
    pub area_sqft: f64,

    /// new or old
    #[arg(long)]
    pub resale: String,

    #[arg(long, allow_negative_numbers = true)]
    pub bedrooms: i64,

    /// Repeat for each amenity, e.g. --amenity Lift --amenity Gym
    #[arg(long = "amenity")]
    pub amenities: Vec<String>,
}

impl From<RequestArgs> for PredictionRequest {
    fn from(args: RequestArgs) -> Self {
        PredictionRequest {
            location: args.location,
            area_sqft: args.area_sqft,
            resale: args.resale,
            no_of_bedrooms: args.bedrooms,
            amenities: args.amenities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predict_request() {
        let cli = Cli::try_parse_from([
            "reis",
            "--artifacts-dir",
            "/tmp/art",
            "predict",
            "--location",
            "Adyar",
            "--area-sqft",
            "1200",
            "--resale",
            "new",
            "--bedrooms",
            "3",
            "--amenity",
            "Lift",
            "--amenity",
            "Gym",
        ])
        .unwrap();

        assert_eq!(cli.paths.model_path(), PathBuf::from("/tmp/art/reis_model.json"));
        match cli.command {
            Command::Predict { request, json } => {
                assert!(!json);
                let request = PredictionRequest::from(request);
                assert_eq!(request.no_of_bedrooms, 3);
                assert_eq!(request.amenities, vec!["Lift", "Gym"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn explicit_model_path_wins() {
        let cli = Cli::try_parse_from([
            "reis",
            "insights",
            "--location",
            "adyar",
            "--model",
            "boosters/reis.bin",
        ])
        .unwrap();
        assert_eq!(cli.paths.model_path(), PathBuf::from("boosters/reis.bin"));
    }
}
