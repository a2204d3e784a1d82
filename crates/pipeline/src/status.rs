//! Per-source status vocabulary normalization.
//!
//! Each source system reports status in its own raw vocabulary. The mapping
//! to canonical states is explicit configuration data, validated exhaustively
//! at load time — an unrecognized raw status at reconciliation time is a
//! data-quality error, never a silent default.

use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::model::BookingStatus;

/// Finite raw → canonical status mapping for one source system.
#[derive(Debug, Clone)]
pub struct StatusMap {
    entries: BTreeMap<String, BookingStatus>,
}

impl StatusMap {
    /// Build from the raw config table, rejecting non-canonical targets.
    pub fn from_raw(
        source: &str,
        raw: &BTreeMap<String, String>,
    ) -> Result<Self, PipelineError> {
        if raw.is_empty() {
            return Err(PipelineError::ConfigValidation(format!(
                "source '{source}': status_map must not be empty"
            )));
        }

        let mut entries = BTreeMap::new();
        for (from, to) in raw {
            let status = BookingStatus::parse(to).ok_or_else(|| {
                PipelineError::ConfigValidation(format!(
                    "source '{source}': status_map maps '{from}' to '{to}', \
                     expected one of pending/confirmed/cancelled"
                ))
            })?;
            entries.insert(from.clone(), status);
        }

        Ok(Self { entries })
    }

    /// Normalize a raw status value. `None` means unmapped.
    pub fn normalize(&self, raw: &str) -> Option<BookingStatus> {
        self.entries.get(raw.trim()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn maps_source_vocabulary() {
        let map = StatusMap::from_raw(
            "bookings",
            &raw_map(&[("CONFIRMED", "confirmed"), ("CANX", "cancelled"), ("HOLD", "pending")]),
        )
        .unwrap();

        assert_eq!(map.normalize("CONFIRMED"), Some(BookingStatus::Confirmed));
        assert_eq!(map.normalize("CANX"), Some(BookingStatus::Cancelled));
        assert_eq!(map.normalize("HOLD"), Some(BookingStatus::Pending));
    }

    #[test]
    fn unmapped_value_is_none() {
        let map = StatusMap::from_raw("bookings", &raw_map(&[("ok", "confirmed")])).unwrap();
        assert_eq!(map.normalize("nope"), None);
    }

    #[test]
    fn trims_raw_value_before_lookup() {
        let map = StatusMap::from_raw("bookings", &raw_map(&[("ok", "confirmed")])).unwrap();
        assert_eq!(map.normalize(" ok "), Some(BookingStatus::Confirmed));
    }

    #[test]
    fn rejects_non_canonical_target() {
        let err = StatusMap::from_raw("events", &raw_map(&[("ok", "booked")])).unwrap_err();
        assert!(err.to_string().contains("'booked'"));
    }

    #[test]
    fn rejects_empty_map() {
        let err = StatusMap::from_raw("events", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
