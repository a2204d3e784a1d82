//! Read-only diagnostic queries for the CLI `inspect` command: column
//! listings, sample rows, dedup and distribution checks.

use std::collections::BTreeMap;

use rusqlite::types::ValueRef;

use crate::error::StoreError;
use crate::store::Store;

/// Count of all rows vs distinct booking_ids. Equal when the uniqueness
/// invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupCheck {
    pub total_rows: i64,
    pub distinct_booking_ids: i64,
}

impl Store {
    /// First `limit` rows of a table, stringified for display.
    pub fn sample_rows(&self, table: &str, limit: usize) -> Result<Vec<Vec<String>>, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {table} LIMIT {limit}"))?;
        let column_count = stmt.column_count();
        let mut query = stmt.query([])?;
        let mut out = Vec::new();

        while let Some(row) = query.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(display_cell(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(out)
    }

    pub fn dedup_check(&self, table: &str) -> Result<DedupCheck, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let (total_rows, distinct_booking_ids) = self.conn.query_row(
            &format!("SELECT COUNT(*), COUNT(DISTINCT booking_id) FROM {table}"),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DedupCheck { total_rows, distinct_booking_ids })
    }

    /// Row counts grouped by a column's value.
    pub fn count_by(&self, table: &str, column: &str) -> Result<BTreeMap<String, i64>, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT COALESCE({column}, 'NULL'), COUNT(*) FROM {table} GROUP BY {column}"
        ))?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }
}

fn display_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE silver_bookings (
                    booking_id TEXT, status TEXT, source_of_truth TEXT
                );
                INSERT INTO silver_bookings VALUES
                    ('B1', 'confirmed', 'bookings'),
                    ('B2', 'cancelled', 'events'),
                    ('B3', 'confirmed', 'bookings');",
            )
            .unwrap();
        store
    }

    #[test]
    fn dedup_check_counts() {
        let store = seeded();
        let check = store.dedup_check("silver_bookings").unwrap();
        assert_eq!(check.total_rows, 3);
        assert_eq!(check.distinct_booking_ids, 3);
    }

    #[test]
    fn count_by_column() {
        let store = seeded();
        let by_status = store.count_by("silver_bookings", "status").unwrap();
        assert_eq!(by_status["confirmed"], 2);
        assert_eq!(by_status["cancelled"], 1);

        let by_truth = store.count_by("silver_bookings", "source_of_truth").unwrap();
        assert_eq!(by_truth["bookings"], 2);
    }

    #[test]
    fn sample_rows_stringified() {
        let store = seeded();
        let rows = store.sample_rows("silver_bookings", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["B1", "confirmed", "bookings"]);
    }

    #[test]
    fn missing_table_surfaces() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.dedup_check("gone").unwrap_err(),
            StoreError::MissingTable(_)
        ));
    }
}
