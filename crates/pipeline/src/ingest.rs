//! Bronze CSV loading — dev/test stand-in for the external ingestion
//! connectors. Header-mapped; extra columns are carried into `attrs`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::PipelineError;
use crate::model::BronzeRecord;

const COL_BOOKING_ID: &str = "booking_id";
const COL_STATUS: &str = "status";
const COL_BOOKING_DATE: &str = "booking_date";
const COL_CITY: &str = "city";
const COL_PRICE_CENTS: &str = "price_cents";
const COL_INGESTED_AT: &str = "ingested_at";

const CONTRACT_COLUMNS: [&str; 6] = [
    COL_BOOKING_ID,
    COL_STATUS,
    COL_BOOKING_DATE,
    COL_CITY,
    COL_PRICE_CENTS,
    COL_INGESTED_AT,
];

/// Parse one source's bronze CSV into records tagged with `source`.
pub fn load_bronze_csv(source: &str, csv_data: &str) -> Result<Vec<BronzeRecord>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, PipelineError> {
        headers.iter().position(|h| h == name).ok_or_else(|| PipelineError::MissingColumn {
            source: source.into(),
            column: name.into(),
        })
    };

    let booking_id_idx = idx(COL_BOOKING_ID)?;
    let status_idx = idx(COL_STATUS)?;
    let date_idx = idx(COL_BOOKING_DATE)?;
    let city_idx = idx(COL_CITY)?;
    let price_idx = idx(COL_PRICE_CENTS)?;
    let ingested_idx = idx(COL_INGESTED_AT)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::Io(e.to_string()))?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();

        let booking_id = cell(booking_id_idx).to_string();

        let status_raw = non_empty(cell(status_idx));
        let city = non_empty(cell(city_idx));

        let booking_date = match non_empty(cell(date_idx)) {
            Some(value) => Some(
                NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                    PipelineError::DateParse {
                        source: source.into(),
                        booking_id: booking_id.clone(),
                        value,
                    }
                })?,
            ),
            None => None,
        };

        let price_cents = match non_empty(cell(price_idx)) {
            Some(value) => {
                Some(value.parse::<i64>().map_err(|_| PipelineError::PriceParse {
                    source: source.into(),
                    booking_id: booking_id.clone(),
                    value,
                })?)
            }
            None => None,
        };

        let ingested_raw = cell(ingested_idx);
        let ingested_at = DateTime::parse_from_rfc3339(ingested_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| PipelineError::TimestampParse {
                source: source.into(),
                booking_id: booking_id.clone(),
                value: ingested_raw.into(),
            })?;

        let mut attrs = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            if CONTRACT_COLUMNS.contains(&header.as_str()) || header == "source_system" {
                continue;
            }
            if let Some(value) = record.get(i) {
                if !value.trim().is_empty() {
                    attrs.insert(header.clone(), value.trim().to_string());
                }
            }
        }

        rows.push(BronzeRecord {
            source_system: source.into(),
            booking_id,
            status_raw,
            booking_date,
            city,
            price_cents,
            ingested_at,
            attrs,
        });
    }

    Ok(rows)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
