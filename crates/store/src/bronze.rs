//! Bronze table access. Tables are per-source and append-only; their schema
//! is owned by ingestion, so reads introspect the actual columns and carry
//! anything outside the contract into `attrs`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use medallion_pipeline::BronzeRecord;
use rusqlite::params;
use rusqlite::types::ValueRef;

use crate::error::StoreError;
use crate::store::Store;

/// Columns every bronze table must carry, whatever else it has.
pub const CONTRACT_COLUMNS: [&str; 6] = [
    "booking_id",
    "status",
    "booking_date",
    "city",
    "price_cents",
    "ingested_at",
];

impl Store {
    /// Create a bronze table with the contract schema (seeding path only;
    /// production bronze tables are created by ingestion).
    pub fn ensure_bronze(&self, table: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                booking_id    TEXT,
                status        TEXT,
                booking_date  TEXT,
                city          TEXT,
                price_cents   INTEGER,
                source_system TEXT,
                ingested_at   TEXT NOT NULL,
                attrs         TEXT NOT NULL DEFAULT '{{}}'
            )"
        ))?;
        Ok(())
    }

    /// Append records. Bronze is append-only: no updates, no deletes.
    pub fn append_bronze(&mut self, table: &str, records: &[BronzeRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table}
                 (booking_id, status, booking_date, city, price_cents, source_system, ingested_at, attrs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for record in records {
                let attrs = serde_json::to_string(&record.attrs)
                    .unwrap_or_else(|_| "{}".to_string());
                stmt.execute(params![
                    record.booking_id,
                    record.status_raw,
                    record.booking_date.map(|d| d.to_string()),
                    record.city,
                    record.price_cents,
                    record.source_system,
                    record.ingested_at.to_rfc3339(),
                    attrs,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read one source's full bronze table.
    pub fn read_bronze(&self, table: &str, source: &str) -> Result<Vec<BronzeRecord>, StoreError> {
        let columns = self.table_columns(table)?;
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();

        for required in CONTRACT_COLUMNS {
            if !names.contains(&required) {
                return Err(StoreError::MissingColumn {
                    table: table.to_string(),
                    column: required.to_string(),
                });
            }
        }

        let col = |name: &str| names.iter().position(|n| *n == name);
        // Contract columns are verified present above.
        let booking_id_idx = col("booking_id").unwrap_or(0);
        let status_idx = col("status").unwrap_or(0);
        let date_idx = col("booking_date").unwrap_or(0);
        let city_idx = col("city").unwrap_or(0);
        let price_idx = col("price_cents").unwrap_or(0);
        let ingested_idx = col("ingested_at").unwrap_or(0);
        let source_idx = col("source_system");
        let attrs_idx = col("attrs");

        let mut stmt = self.conn.prepare(&format!("SELECT * FROM {table}"))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let booking_id: Option<String> = row.get(booking_id_idx)?;
            let status_raw: Option<String> = row.get(status_idx)?;
            let city: Option<String> = row.get(city_idx)?;
            let price_cents: Option<i64> = row.get(price_idx)?;

            let booking_date = match row.get::<_, Option<String>>(date_idx)? {
                Some(text) => Some(parse_date(table, "booking_date", &text)?),
                None => None,
            };

            let ingested_at = match row.get::<_, Option<String>>(ingested_idx)? {
                Some(text) => parse_timestamp(table, "ingested_at", &text)?,
                None => {
                    return Err(StoreError::BadCell {
                        table: table.to_string(),
                        column: "ingested_at".to_string(),
                        value: "NULL".to_string(),
                    })
                }
            };

            let source_system = match source_idx {
                Some(i) => row.get::<_, Option<String>>(i)?.unwrap_or_else(|| source.to_string()),
                None => source.to_string(),
            };

            // attrs column (seeded tables) plus any non-contract columns
            // (externally created tables).
            let mut attrs: BTreeMap<String, String> = match attrs_idx {
                Some(i) => {
                    let text: Option<String> = row.get(i)?;
                    match text.as_deref() {
                        None | Some("") => BTreeMap::new(),
                        Some(json) => serde_json::from_str(json).map_err(|_| StoreError::BadCell {
                            table: table.to_string(),
                            column: "attrs".to_string(),
                            value: json.to_string(),
                        })?,
                    }
                }
                None => BTreeMap::new(),
            };
            for (i, (name, _)) in columns.iter().enumerate() {
                if CONTRACT_COLUMNS.contains(&name.as_str())
                    || name == "source_system"
                    || name == "attrs"
                {
                    continue;
                }
                if let Some(text) = cell_to_string(row.get_ref(i)?) {
                    attrs.insert(name.clone(), text);
                }
            }

            records.push(BronzeRecord {
                source_system,
                booking_id: booking_id.unwrap_or_default(),
                status_raw,
                booking_date,
                city,
                price_cents,
                ingested_at,
                attrs,
            });
        }

        Ok(records)
    }
}

fn cell_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => None,
    }
}

pub(crate) fn parse_date(table: &str, column: &str, text: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| StoreError::BadCell {
        table: table.to_string(),
        column: column.to_string(),
        value: text.to_string(),
    })
}

pub(crate) fn parse_timestamp(
    table: &str,
    column: &str,
    text: &str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::BadCell {
            table: table.to_string(),
            column: column.to_string(),
            value: text.to_string(),
        })
}
