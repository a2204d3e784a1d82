//! Gold rollup storage. Derived, never hand-edited; replaced whole on each
//! aggregation run with the same staged-swap discipline as silver.

use medallion_pipeline::DailyCityKpi;
use rusqlite::params;

use crate::bronze::parse_date;
use crate::error::StoreError;
use crate::store::Store;

impl Store {
    pub fn replace_gold(&mut self, table: &str, rows: &[DailyCityKpi]) -> Result<(), StoreError> {
        let staging = format!("{table}_staging");
        let tx = self.conn.transaction()?;

        // Column names are the external consumers' contract; revenue and
        // average price hold integer minor units / full-precision reals.
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {staging};
             CREATE TABLE {staging} (
                booking_date       TEXT NOT NULL,
                city               TEXT NOT NULL,
                total_bookings     INTEGER NOT NULL,
                confirmed_bookings INTEGER NOT NULL,
                cancelled_bookings INTEGER NOT NULL,
                pending_bookings   INTEGER NOT NULL,
                cancellation_rate  REAL NOT NULL,
                total_revenue      INTEGER NOT NULL,
                avg_booking_price  REAL NOT NULL,
                PRIMARY KEY (booking_date, city)
             )"
        ))?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {staging} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.booking_date.to_string(),
                    row.city,
                    row.total_bookings as i64,
                    row.confirmed_bookings as i64,
                    row.cancelled_bookings as i64,
                    row.pending_bookings as i64,
                    row.cancellation_rate,
                    row.total_revenue_cents,
                    row.avg_booking_price_cents,
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

    pub fn read_gold(&self, table: &str) -> Result<Vec<DailyCityKpi>, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT booking_date, city, total_bookings, confirmed_bookings, cancelled_bookings,
                    pending_bookings, cancellation_rate, total_revenue, avg_booking_price
             FROM {table} ORDER BY booking_date, city"
        ))?;
        let mut query = stmt.query([])?;
        let mut rows = Vec::new();

        while let Some(row) = query.next()? {
            let date_text: String = row.get(0)?;
            rows.push(DailyCityKpi {
                booking_date: parse_date(table, "booking_date", &date_text)?,
                city: row.get(1)?,
                total_bookings: row.get::<_, i64>(2)? as u64,
                confirmed_bookings: row.get::<_, i64>(3)? as u64,
                cancelled_bookings: row.get::<_, i64>(4)? as u64,
                pending_bookings: row.get::<_, i64>(5)? as u64,
                cancellation_rate: row.get(6)?,
                total_revenue_cents: row.get(7)?,
                avg_booking_price_cents: row.get(8)?,
            });
        }

        Ok(rows)
    }
}
