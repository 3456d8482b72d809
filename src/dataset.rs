use std::fs;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{ReisError, Result};

pub const LOCATION_COL: &str = "location";
pub const PRICE_COL: &str = "price";
pub const AREA_COL: &str = "area_sqft";

/// Download the reference CSV from `url` and store it at `out`.
pub fn download_csv_file(url: &str, out: impl AsRef<Path>) -> Result<u64> {
    let out = out.as_ref();
    info!(%url, "downloading reference dataset");

    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(out, &bytes)?;

    info!(path = %out.display(), bytes = bytes.len(), "saved reference dataset");
    Ok(bytes.len() as u64)
}

/// Read the historical property records from a CSV file.
pub fn load_csv_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReader::from_path(path)?.has_header(true).finish()?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded reference dataset"
    );
    select_reference_columns(&df)
}

/// Keep the columns the insights engine needs, typed, with unusable rows dropped.
///
/// A row is unusable when any of location, price or area is null, or when the
/// area is not positive (price-per-area would be undefined).
pub fn select_reference_columns(df: &DataFrame) -> Result<DataFrame> {
    for col in [LOCATION_COL, PRICE_COL, AREA_COL] {
        if df.column(col).is_err() {
            return Err(ReisError::Artifact(format!(
                "reference dataset has no '{col}' column"
            )));
        }
    }

    let location = df.column(LOCATION_COL)?.cast(&DataType::Utf8)?;
    let price = df.column(PRICE_COL)?.cast(&DataType::Float64)?;
    let area = df.column(AREA_COL)?.cast(&DataType::Float64)?;

    let mask = &location.is_not_null() & &price.is_not_null();
    let mask = &mask & &area.f64()?.gt(0.0);

    let selected = DataFrame::new(vec![location, price, area])?.filter(&mask)?;
    let dropped = df.height() - selected.height();
    if dropped > 0 {
        debug!(dropped, "skipped reference rows with missing or non-positive values");
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_keeps_reference_columns_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "location,price,area_sqft,bedrooms").unwrap();
        writeln!(file, "Adyar,5000000,1000,2").unwrap();
        writeln!(file, "Velachery,4000000,800,2").unwrap();
        file.flush().unwrap();

        let df = load_csv_file(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), &[LOCATION_COL, PRICE_COL, AREA_COL]);
        assert_eq!(df.column(PRICE_COL).unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn drops_rows_without_positive_area() {
        let df = df!(
            LOCATION_COL => &["adyar", "adyar", "adyar"],
            PRICE_COL => &[1.0, 2.0, 3.0],
            AREA_COL => &[100.0, 0.0, -4.0]
        )
        .unwrap();
        let selected = select_reference_columns(&df).unwrap();
        assert_eq!(selected.height(), 1);
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df!(LOCATION_COL => &["adyar"], PRICE_COL => &[1.0]).unwrap();
        let err = select_reference_columns(&df).unwrap_err();
        assert!(err.to_string().contains(AREA_COL));
    }
}
