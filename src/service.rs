use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::encoder::{FeatureEncoder, PredictionRequest};
use crate::error::Result;
use crate::insights::{round2, Insights, InsightsEngine, LAKH};
use crate::model::PriceModel;

/// Share of the local median within which an estimate counts as in line with the market.
pub const MARKET_BAND: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub estimated_price_lakhs: f64,
    pub insights: Insights,
}

impl PredictionResponse {
    pub fn market_position(&self) -> Option<MarketPosition> {
        self.insights
            .median_price_lakhs
            .map(|median| MarketPosition::classify(self.estimated_price_lakhs, median))
    }
}

/// Where an estimate sits relative to the median price of its location group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    BelowMarket,
    InLine,
    AboveMarket,
}

impl MarketPosition {
    pub fn classify(estimate_lakhs: f64, median_lakhs: f64) -> Self {
        let band = MARKET_BAND * median_lakhs;
        if estimate_lakhs < median_lakhs - band {
            MarketPosition::BelowMarket
        } else if estimate_lakhs > median_lakhs + band {
            MarketPosition::AboveMarket
        } else {
            MarketPosition::InLine
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            MarketPosition::BelowMarket => {
                "Prices in this area are generally higher than this estimate. \
                 The estimate is on the lower side compared to overall prices in the area, \
                 so treat it as a starting point when checking similar houses."
            }
            MarketPosition::InLine => {
                "This estimate is close to what houses usually cost in this area \
                 and can be used as a reference when judging a similar listing."
            }
            MarketPosition::AboveMarket => {
                "Prices in this area are generally lower than this estimate. \
                 The selected property may have more or better features than a typical home here, \
                 so compare carefully with similar houses before deciding."
            }
        }
    }
}

/// Encoder, model and insights engine wired together. Built once at startup.
pub struct PredictionService {
    encoder: FeatureEncoder,
    model: Box<dyn PriceModel>,
    insights: InsightsEngine,
}

impl PredictionService {
    pub fn new(
        encoder: FeatureEncoder,
        model: Box<dyn PriceModel>,
        insights: InsightsEngine,
    ) -> Self {
        // the encoder vocabulary is frozen at training time while insights groups
        // come from the reference data; they should name the same groups
        let vocabulary = encoder.artifacts().location_groups();
        let grouped = insights.grouped_locations();
        let only_in_vocabulary: Vec<&String> =
            vocabulary.iter().filter(|loc| !grouped.contains(*loc)).collect();
        let only_in_insights: Vec<&String> = grouped
            .iter()
            .filter(|loc| !vocabulary.contains(*loc))
            .collect();
        if !only_in_vocabulary.is_empty() || !only_in_insights.is_empty() {
            warn!(
                ?only_in_vocabulary,
                ?only_in_insights,
                "location vocabulary and insights groups diverge"
            );
        }

        Self {
            encoder,
            model,
            insights,
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn insights_engine(&self) -> &InsightsEngine {
        &self.insights
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let row = self.encoder.encode(request)?;
        debug!(row = ?row.iter().collect::<Vec<_>>(), "aligned feature row");
        let log_price = self.model.predict_log_price(&row)?;

        // model predicts ln(price in rupees)
        let estimated_price_lakhs = round2(log_price.exp() / LAKH);
        let insights = self.insights.insights(&request.location)?;

        debug!(
            location = %request.location,
            log_price,
            estimated_price_lakhs,
            "prediction done"
        );
        Ok(PredictionResponse {
            estimated_price_lakhs,
            insights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_five_percent_band() {
        assert_eq!(MarketPosition::classify(94.0, 100.0), MarketPosition::BelowMarket);
        assert_eq!(MarketPosition::classify(96.0, 100.0), MarketPosition::InLine);
        assert_eq!(MarketPosition::classify(104.0, 100.0), MarketPosition::InLine);
        assert_eq!(MarketPosition::classify(106.0, 100.0), MarketPosition::AboveMarket);
    }

    #[test]
    fn no_position_without_median() {
        let response = PredictionResponse {
            estimated_price_lakhs: 50.0,
            insights: Insights::default(),
        };
        assert_eq!(response.market_position(), None);
    }

    #[test]
    fn response_serializes_with_wire_names() {
        let response = PredictionResponse {
            estimated_price_lakhs: 72.5,
            insights: Insights {
                median_price_lakhs: Some(70.0),
                price_range_lakhs: Some((60, 80)),
                median_price_per_sqft: Some(7000),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["estimated_price_lakhs"], 72.5);
        assert_eq!(json["insights"]["price_range_lakhs"], serde_json::json!([60, 80]));
        assert_eq!(json["insights"]["median_price_per_sqft"], 7000);
    }
}
