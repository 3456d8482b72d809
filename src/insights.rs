//! Descriptive market statistics for the location group of a request.
//!
//! Grouping happens once, when the engine is built: locations seen fewer than
//! [`RARE_LOCATION_THRESHOLD`] times in the reference data are merged into the
//! "other" group so that no statistic is reported from a tiny sample.

use std::collections::{BTreeSet, HashMap};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifacts::{normalize_label, OTHER_LOCATION};
use crate::dataset::{select_reference_columns, AREA_COL, LOCATION_COL, PRICE_COL};
use crate::error::Result;

/// Locations with fewer rows than this are folded into "other".
pub const RARE_LOCATION_THRESHOLD: usize = 20;

/// Reporting unit for prices (one lakh).
pub const LAKH: f64 = 100_000.0;

pub const GROUP_COL: &str = "location_grouped";
pub const PRICE_PER_SQFT_COL: &str = "price_per_sqft";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub median_price_lakhs: Option<f64>,
    pub price_range_lakhs: Option<(i64, i64)>,
    pub median_price_per_sqft: Option<i64>,
}

impl Insights {
    /// No comparable data was found for the group.
    pub fn is_empty(&self) -> bool {
        self.median_price_lakhs.is_none()
            && self.price_range_lakhs.is_none()
            && self.median_price_per_sqft.is_none()
    }
}

/// Group names retained for a set of normalized locations under the rare-location rule.
///
/// "other" is part of the result whenever at least one location was folded.
pub fn retained_locations<'a, I>(locations: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for loc in locations {
        *counts.entry(loc).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(loc, count)| {
            if count < RARE_LOCATION_THRESHOLD {
                OTHER_LOCATION.to_string()
            } else {
                loc.to_string()
            }
        })
        .collect()
}

pub struct InsightsEngine {
    frame: DataFrame,
    groups: BTreeSet<String>,
}

impl InsightsEngine {
    pub fn new(reference: &DataFrame) -> Result<Self> {
        let mut frame = select_reference_columns(reference)?;

        let normalized: Vec<String> = frame
            .column(LOCATION_COL)?
            .utf8()?
            .into_iter()
            .map(|loc| normalize_label(loc.unwrap_or_default()))
            .collect();
        let groups = retained_locations(normalized.iter().map(String::as_str));
        let grouped: Vec<String> = normalized
            .iter()
            .map(|loc| {
                if groups.contains(loc) {
                    loc.clone()
                } else {
                    OTHER_LOCATION.to_string()
                }
            })
            .collect();

        let price_per_sqft = {
            let price = frame.column(PRICE_COL)?.f64()?;
            let area = frame.column(AREA_COL)?.f64()?;
            let mut ppsf = price / area;
            ppsf.rename(PRICE_PER_SQFT_COL);
            ppsf.into_series()
        };

        frame.with_column(Series::new(LOCATION_COL, normalized))?;
        frame.with_column(Series::new(GROUP_COL, grouped))?;
        frame.with_column(price_per_sqft)?;

        info!(
            rows = frame.height(),
            groups = groups.len(),
            "built location groups for insights"
        );
        Ok(Self { frame, groups })
    }

    /// Sorted names of the location groups, including "other" when present.
    pub fn grouped_locations(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// The group a raw location is reported under.
    pub fn resolve_group(&self, location: &str) -> String {
        let location = normalize_label(location);
        if self.groups.contains(&location) {
            location
        } else {
            OTHER_LOCATION.to_string()
        }
    }

    /// Historical rows belonging to the location's group.
    pub fn location_subset(&self, location: &str) -> Result<DataFrame> {
        let group = self.resolve_group(location);
        let mask = self.frame.column(GROUP_COL)?.utf8()?.equal(group.as_str());
        let subset = self.frame.filter(&mask)?;
        debug!(%group, rows = subset.height(), "filtered reference rows");
        Ok(subset)
    }

    pub fn insights(&self, location: &str) -> Result<Insights> {
        let subset = self.location_subset(location)?;
        if subset.height() == 0 {
            return Ok(Insights::default());
        }
        Ok(Insights {
            median_price_lakhs: median_price_lakhs(&subset)?,
            price_range_lakhs: price_range_lakhs(&subset)?,
            median_price_per_sqft: median_price_per_sqft(&subset)?,
        })
    }
}

/// Median price in lakhs, rounded to two decimals.
pub fn median_price_lakhs(subset: &DataFrame) -> Result<Option<f64>> {
    let median = subset.column(PRICE_COL)?.f64()?.median();
    Ok(median.map(|m| round2(m / LAKH)))
}

/// 25th and 75th percentile of price in lakhs, truncated.
pub fn price_range_lakhs(subset: &DataFrame) -> Result<Option<(i64, i64)>> {
    let price = subset.column(PRICE_COL)?.f64()?;
    let low = price.quantile(0.25, QuantileInterpolOptions::Linear)?;
    let high = price.quantile(0.75, QuantileInterpolOptions::Linear)?;
    Ok(low
        .zip(high)
        .map(|(lo, hi)| ((lo / LAKH).trunc() as i64, (hi / LAKH).trunc() as i64)))
}

/// Median of price per square foot, truncated.
pub fn median_price_per_sqft(subset: &DataFrame) -> Result<Option<i64>> {
    let median = subset.column(PRICE_PER_SQFT_COL)?.f64()?.median();
    Ok(median.map(|m| m.trunc() as i64))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
