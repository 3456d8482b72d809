use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reis::config::{Cli, Command, PathsConfig};
use reis::dataset::{download_csv_file, load_csv_file};
use reis::prepare::derive_artifacts;
use reis::{
    load_model, FeatureEncoder, Insights, InsightsEngine, PredictionRequest, PredictionResponse,
    PredictionService,
};

// Entry point
// 1. Load frozen artifacts (vocabulary + schema) and the reference dataset once
// 2. Build the encoder, model and insights engine
// 3. Run the requested command against them

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = cli.paths;

    match cli.command {
        Command::Predict { request, json } => {
            let service = build_service(&paths)?;
            let request: PredictionRequest = request.into();
            let response = service.predict(&request)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_prediction(&response);
            }
        }
        Command::Insights { location, json } => {
            let reference = load_csv_file(&paths.dataset)
                .with_context(|| format!("loading dataset {}", paths.dataset.display()))?;
            let engine = InsightsEngine::new(&reference)?;
            let insights = engine.insights(&location)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                println!("Location group: {}", engine.resolve_group(&location));
                print_insights(&insights);
            }
        }
        Command::PrepareArtifacts { out } => {
            let reference = load_csv_file(&paths.dataset)
                .with_context(|| format!("loading dataset {}", paths.dataset.display()))?;
            let artifacts = derive_artifacts(&reference)?;

            let out = out.unwrap_or_else(|| paths.artifacts_dir.clone());
            artifacts.save(&out)?;
            println!(
                "Wrote {} location groups and {} feature columns to {}",
                artifacts.location_groups().len(),
                artifacts.feature_columns().len(),
                out.display()
            );
        }
        Command::FetchDataset { url, out } => {
            let out = out.unwrap_or_else(|| paths.dataset.clone());
            let bytes = download_csv_file(&url, &out)?;
            println!("Saved {bytes} bytes to {}", out.display());
        }
    }

    Ok(())
}

fn build_service(paths: &PathsConfig) -> anyhow::Result<PredictionService> {
    let artifacts = paths
        .load_artifacts()
        .with_context(|| format!("loading artifacts from {}", paths.artifacts_dir.display()))?;

    let model_path = paths.model_path();
    let model = load_model(&model_path, &artifacts)
        .with_context(|| format!("loading model {}", model_path.display()))?;

    let reference = load_csv_file(&paths.dataset)
        .with_context(|| format!("loading dataset {}", paths.dataset.display()))?;
    let insights = InsightsEngine::new(&reference)?;

    Ok(PredictionService::new(FeatureEncoder::new(artifacts), model, insights))
}

fn print_prediction(response: &PredictionResponse) {
    println!("Estimated market price: ₹ {} Lakhs", response.estimated_price_lakhs);
    println!();
    print_insights(&response.insights);

    if let Some(position) = response.market_position() {
        println!();
        println!("{}", position.summary());
    }
    println!();
    println!(
        "Note: this estimate supports decision making and may not reflect \
         the exact value of a specific property."
    );
}

fn print_insights(insights: &Insights) {
    if insights.is_empty() {
        println!("No comparable sales found for this area.");
        return;
    }
    if let Some((low, high)) = insights.price_range_lakhs {
        println!(
            "Houses in this area are mostly priced between ₹ {low} Lakhs and ₹ {high} Lakhs."
        );
    }
    if let Some(median) = insights.median_price_lakhs {
        println!("Within this range, most homes are priced around ₹ {median} Lakhs.");
    }
    if let Some(ppsf) = insights.median_price_per_sqft {
        println!("The usual price per square foot in this area is ₹ {ppsf}.");
    }
}
