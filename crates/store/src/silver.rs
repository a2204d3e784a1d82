//! Silver ledger storage. Single writer (the reconciliation run); each run
//! replaces the whole table via a staged atomic swap.

use std::collections::BTreeMap;

use medallion_pipeline::{BookingStatus, CanonicalBooking};
use rusqlite::params;

use crate::bronze::parse_date;
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    /// Replace the silver ledger in one transaction. Readers see the prior
    /// snapshot until commit; a failure mid-write rolls back and leaves the
    /// prior snapshot untouched.
    pub fn replace_silver(
        &mut self,
        table: &str,
        bookings: &[CanonicalBooking],
    ) -> Result<(), StoreError> {
        let staging = format!("{table}_staging");
        let tx = self.conn.transaction()?;

        // Column names are the external consumers' contract; `price` holds
        // integer minor units.
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {staging};
             CREATE TABLE {staging} (
                booking_id      TEXT PRIMARY KEY,
                status          TEXT NOT NULL,
                source_of_truth TEXT NOT NULL,
                booking_date    TEXT,
                city            TEXT,
                price           INTEGER,
                attrs           TEXT NOT NULL DEFAULT '{{}}'
             )"
        ))?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {staging}
                 (booking_id, status, source_of_truth, booking_date, city, price, attrs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))?;
            for booking in bookings {
                let attrs = serde_json::to_string(&booking.attrs)
                    .unwrap_or_else(|_| "{}".to_string());
                stmt.execute(params![
                    booking.booking_id,
                    booking.status.as_str(),
                    booking.source_of_truth,
                    booking.booking_date.map(|d| d.to_string()),
                    booking.city,
                    booking.price_cents,
                    attrs,
                ])?;
            }
        }

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             ALTER TABLE {staging} RENAME TO {table};"
        ))?;
        tx.commit()?;
        Ok(())
    }

    pub fn read_silver(&self, table: &str) -> Result<Vec<CanonicalBooking>, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT booking_id, status, source_of_truth, booking_date, city, price, attrs
             FROM {table} ORDER BY booking_id"
        ))?;
        let mut rows = stmt.query([])?;
        let mut bookings = Vec::new();

        while let Some(row) = rows.next()? {
            let status_text: String = row.get(1)?;
            let status = BookingStatus::parse(&status_text).ok_or_else(|| StoreError::BadCell {
                table: table.to_string(),
                column: "status".to_string(),
                value: status_text.clone(),
            })?;

            let booking_date = match row.get::<_, Option<String>>(3)? {
                Some(text) => Some(parse_date(table, "booking_date", &text)?),
                None => None,
            };

            let attrs_text: String = row.get(6)?;
            let attrs: BTreeMap<String, String> =
                serde_json::from_str(&attrs_text).map_err(|_| StoreError::BadCell {
                    table: table.to_string(),
                    column: "attrs".to_string(),
                    value: attrs_text.clone(),
                })?;

            bookings.push(CanonicalBooking {
                booking_id: row.get(0)?,
                status,
                source_of_truth: row.get(2)?,
                booking_date,
                city: row.get(4)?,
                price_cents: row.get(5)?,
                attrs,
            });
        }

        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn booking(id: &str, status: BookingStatus) -> CanonicalBooking {
        CanonicalBooking {
            booking_id: id.into(),
            status,
            source_of_truth: "bookings".into(),
            booking_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            city: Some("NYC".into()),
            price_cents: Some(10_000),
            attrs: BTreeMap::from([("channel".to_string(), "web".to_string())]),
        }
    }

    #[test]
    fn replace_and_read_round_trip() {
        let mut store = Store::open_in_memory().unwrap();
        let rows = vec![
            booking("B1", BookingStatus::Confirmed),
            booking("B2", BookingStatus::Cancelled),
        ];
        store.replace_silver("silver_bookings", &rows).unwrap();

        let read = store.read_silver("silver_bookings").unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn replace_is_full_not_incremental() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_silver("silver_bookings", &[booking("B1", BookingStatus::Confirmed)])
            .unwrap();
        store
            .replace_silver("silver_bookings", &[booking("B2", BookingStatus::Pending)])
            .unwrap();

        let read = store.read_silver("silver_bookings").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].booking_id, "B2");
    }

    #[test]
    fn empty_replace_yields_empty_table() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_silver("silver_bookings", &[booking("B1", BookingStatus::Confirmed)])
            .unwrap();
        store.replace_silver("silver_bookings", &[]).unwrap();
        assert!(store.read_silver("silver_bookings").unwrap().is_empty());
    }

    #[test]
    fn failed_replace_keeps_prior_snapshot() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_silver("silver_bookings", &[booking("B1", BookingStatus::Confirmed)])
            .unwrap();

        // Duplicate booking_id violates the staging primary key; the
        // transaction rolls back.
        let dup = vec![
            booking("B2", BookingStatus::Pending),
            booking("B2", BookingStatus::Pending),
        ];
        assert!(store.replace_silver("silver_bookings", &dup).is_err());

        let read = store.read_silver("silver_bookings").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].booking_id, "B1");
    }

    #[test]
    fn stored_columns_match_ledger_contract() {
        // External read-only consumers query these columns by name.
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_silver("silver_bookings", &[booking("B1", BookingStatus::Confirmed)])
            .unwrap();

        let names: Vec<String> = store
            .table_columns("silver_bookings")
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            ["booking_id", "status", "source_of_truth", "booking_date", "city", "price", "attrs"]
        );
    }

    #[test]
    fn unknown_status_in_storage_is_bad_cell() {
        let mut store = Store::open_in_memory().unwrap();
        store.replace_silver("silver_bookings", &[]).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO silver_bookings (booking_id, status, source_of_truth, attrs)
                 VALUES ('B1', 'maybe', 'bookings', '{}')",
                [],
            )
            .unwrap();

        let err = store.read_silver("silver_bookings").unwrap_err();
        assert!(matches!(err, StoreError::BadCell { ref value, .. } if value == "maybe"));
    }
}
