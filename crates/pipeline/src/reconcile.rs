//! Reconciliation engine: bronze → silver.
//!
//! Deduplicates raw records by `booking_id` and resolves each field
//! independently to the value from the highest-precedence source that
//! reports it. Ties at equal precedence fall back to `ingested_at`
//! ascending, then source name; a residual tie with conflicting values is a
//! data-quality error, never an arbitrary pick.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{BronzeRecord, CanonicalBooking, ReconcileInput};
use crate::report::{ReconcileReport, SourceStats};
use crate::status::StatusMap;

#[derive(Debug)]
pub struct ReconcileOutput {
    /// Silver rows, sorted by booking_id. Exactly one per booking_id.
    pub bookings: Vec<CanonicalBooking>,
    pub report: ReconcileReport,
}

/// Run reconciliation over the full bronze corpus.
///
/// Deterministic: identical input multisets produce identical output
/// regardless of record ordering. Empty input produces an empty ledger.
pub fn run(
    config: &PipelineConfig,
    input: &ReconcileInput,
) -> Result<ReconcileOutput, PipelineError> {
    let ranks: BTreeMap<&str, usize> = config
        .precedence
        .iter()
        .enumerate()
        .map(|(rank, source)| (source.as_str(), rank))
        .collect();
    let status_maps = config.status_maps()?;

    let mut report = ReconcileReport::default();

    // Group by booking_id across all sources
    let mut groups: BTreeMap<&str, Vec<&BronzeRecord>> = BTreeMap::new();
    for (source, records) in &input.records {
        if !ranks.contains_key(source.as_str()) {
            return Err(PipelineError::UnknownSource(source.clone()));
        }
        let stats = report.sources.entry(source.clone()).or_insert_with(SourceStats::default);
        stats.records_in = records.len();
        for record in records {
            if !ranks.contains_key(record.source_system.as_str()) {
                return Err(PipelineError::UnknownSource(record.source_system.clone()));
            }
            if record.booking_id.trim().is_empty() {
                stats.missing_booking_id += 1;
                continue;
            }
            groups.entry(record.booking_id.as_str()).or_default().push(record);
        }
    }
    report.groups_total = groups.len();

    let mut bookings = Vec::with_capacity(groups.len());
    for (booking_id, mut candidates) in groups {
        candidates.sort_by(|a, b| tie_key(&ranks, a).cmp(&tie_key(&ranks, b)));

        match resolve_group(booking_id, &candidates, &ranks, &status_maps, &mut report)? {
            Some(booking) => bookings.push(booking),
            None => report.skipped_no_status += 1,
        }
    }
    report.rows_written = bookings.len();

    Ok(ReconcileOutput { bookings, report })
}

/// Full deterministic candidate order: precedence rank, then ingestion
/// time ascending, then source name.
fn tie_key<'a>(
    ranks: &BTreeMap<&str, usize>,
    record: &'a BronzeRecord,
) -> (usize, DateTime<Utc>, &'a str) {
    let rank = ranks.get(record.source_system.as_str()).copied().unwrap_or(usize::MAX);
    (rank, record.ingested_at, record.source_system.as_str())
}

fn resolve_group(
    booking_id: &str,
    candidates: &[&BronzeRecord],
    ranks: &BTreeMap<&str, usize>,
    status_maps: &BTreeMap<String, StatusMap>,
    report: &mut ReconcileReport,
) -> Result<Option<CanonicalBooking>, PipelineError> {
    // Status gets its own resolution: the winning source becomes the row's
    // source_of_truth, since a late event from a lesser source can flip the
    // final disposition.
    let Some((status_pos, status_raw)) = first_value(candidates, status_value) else {
        return Ok(None);
    };
    check_ambiguity(booking_id, candidates, status_pos, &status_raw, ranks, status_value, "status")?;

    let truth = candidates[status_pos];
    let status_map = status_maps.get(&truth.source_system).ok_or_else(|| {
        PipelineError::UnknownSource(truth.source_system.clone())
    })?;
    let status = status_map.normalize(&status_raw).ok_or_else(|| {
        PipelineError::UnmappedStatus {
            source: truth.source_system.clone(),
            booking_id: booking_id.to_string(),
            value: status_raw.clone(),
        }
    })?;

    let booking_date =
        resolve_field(booking_id, candidates, ranks, |r| r.booking_date, "booking_date")?;
    let city = resolve_field(booking_id, candidates, ranks, |r| r.city.clone(), "city")?;
    let price_cents =
        resolve_field(booking_id, candidates, ranks, |r| r.price_cents, "price_cents")?;

    // Carried-through attrs: per key, first candidate in order wins
    let mut attrs = BTreeMap::new();
    for record in candidates {
        for (key, value) in &record.attrs {
            attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    *report.source_of_truth_counts.entry(truth.source_system.clone()).or_insert(0) += 1;
    *report.status_counts.entry(status.to_string()).or_insert(0) += 1;

    Ok(Some(CanonicalBooking {
        booking_id: booking_id.to_string(),
        status,
        source_of_truth: truth.source_system.clone(),
        booking_date,
        city,
        price_cents,
        attrs,
    }))
}

fn status_value(record: &BronzeRecord) -> Option<String> {
    record
        .status_raw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve one field: first non-null value in candidate order, with the
/// defensive residual-tie check.
fn resolve_field<T, F>(
    booking_id: &str,
    candidates: &[&BronzeRecord],
    ranks: &BTreeMap<&str, usize>,
    get: F,
    field: &'static str,
) -> Result<Option<T>, PipelineError>
where
    T: PartialEq,
    F: Fn(&BronzeRecord) -> Option<T>,
{
    let Some((pos, value)) = first_value(candidates, &get) else {
        return Ok(None);
    };
    check_ambiguity(booking_id, candidates, pos, &value, ranks, &get, field)?;
    Ok(Some(value))
}

fn first_value<T, F>(candidates: &[&BronzeRecord], get: F) -> Option<(usize, T)>
where
    F: Fn(&BronzeRecord) -> Option<T>,
{
    candidates
        .iter()
        .enumerate()
        .find_map(|(i, record)| get(record).map(|value| (i, value)))
}

/// Candidates are sorted, so any record that ties the winner on the full
/// tie-break key is adjacent. A tied record disagreeing on the value means
/// the deterministic order cannot separate them.
fn check_ambiguity<T, F>(
    booking_id: &str,
    candidates: &[&BronzeRecord],
    winner_pos: usize,
    winner_value: &T,
    ranks: &BTreeMap<&str, usize>,
    get: F,
    field: &'static str,
) -> Result<(), PipelineError>
where
    T: PartialEq,
    F: Fn(&BronzeRecord) -> Option<T>,
{
    let winner_key = tie_key(ranks, candidates[winner_pos]);
    for record in &candidates[winner_pos + 1..] {
        if tie_key(ranks, record) != winner_key {
            break;
        }
        if let Some(other) = get(record) {
            if other != *winner_value {
                return Err(PipelineError::AmbiguousConflict {
                    booking_id: booking_id.to_string(),
                    field,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookingStatus;
    use chrono::{NaiveDate, TimeZone};

    const CONFIG: &str = r#"
name = "Test"
precedence = ["bookings", "events", "hotels"]

[sources.bookings]
table = "bronze_bookings"
[sources.bookings.status_map]
CONFIRMED = "confirmed"
CANCELLED = "cancelled"
PENDING   = "pending"

[sources.events]
table = "bronze_events"
[sources.events.status_map]
booking_confirmed = "confirmed"
booking_cancelled = "cancelled"

[sources.hotels]
table = "bronze_hotels"
[sources.hotels.status_map]
ok   = "confirmed"
void = "cancelled"
"#;

    fn config() -> PipelineConfig {
        PipelineConfig::from_toml(CONFIG).unwrap()
    }

    fn record(source: &str, booking_id: &str, status: Option<&str>) -> BronzeRecord {
        BronzeRecord {
            source_system: source.into(),
            booking_id: booking_id.into(),
            status_raw: status.map(Into::into),
            booking_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            city: Some("NYC".into()),
            price_cents: Some(10_000),
            ingested_at: Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
            attrs: BTreeMap::new(),
        }
    }

    fn input(records: Vec<BronzeRecord>) -> ReconcileInput {
        let mut grouped: BTreeMap<String, Vec<BronzeRecord>> = BTreeMap::new();
        for r in records {
            grouped.entry(r.source_system.clone()).or_default().push(r);
        }
        ReconcileInput { records: grouped }
    }

    #[test]
    fn empty_input_is_empty_ledger() {
        let out = run(&config(), &ReconcileInput::default()).unwrap();
        assert!(out.bookings.is_empty());
        assert_eq!(out.report.groups_total, 0);
    }

    #[test]
    fn booking_id_unique_across_sources() {
        let out = run(
            &config(),
            &input(vec![
                record("bookings", "B1", Some("CONFIRMED")),
                record("events", "B1", Some("booking_confirmed")),
                record("hotels", "B1", Some("ok")),
                record("bookings", "B2", Some("PENDING")),
            ]),
        )
        .unwrap();

        assert_eq!(out.bookings.len(), 2);
        assert_eq!(out.bookings[0].booking_id, "B1");
        assert_eq!(out.bookings[1].booking_id, "B2");
        assert_eq!(out.report.groups_total, 2);
        assert_eq!(out.report.rows_written, 2);
    }

    #[test]
    fn high_precedence_status_wins() {
        // bookings (high) says confirmed, events (low) says cancelled
        let out = run(
            &config(),
            &input(vec![
                record("events", "B1", Some("booking_cancelled")),
                record("bookings", "B1", Some("CONFIRMED")),
            ]),
        )
        .unwrap();

        assert_eq!(out.bookings[0].status, BookingStatus::Confirmed);
        assert_eq!(out.bookings[0].source_of_truth, "bookings");
    }

    #[test]
    fn fields_resolved_independently() {
        // High-precedence source has status but no city/price; lower
        // sources fill the gaps field by field.
        let mut a = record("bookings", "B1", Some("CONFIRMED"));
        a.city = None;
        a.price_cents = None;
        let mut b = record("events", "B1", None);
        b.city = Some("Lisbon".into());
        b.price_cents = None;
        let mut c = record("hotels", "B1", Some("void"));
        c.city = Some("Porto".into());
        c.price_cents = Some(4_200);

        let out = run(&config(), &input(vec![a, b, c])).unwrap();
        let row = &out.bookings[0];
        assert_eq!(row.status, BookingStatus::Confirmed);
        assert_eq!(row.source_of_truth, "bookings");
        assert_eq!(row.city.as_deref(), Some("Lisbon"));
        assert_eq!(row.price_cents, Some(4_200));
    }

    #[test]
    fn status_truth_can_come_from_lower_source() {
        // High-precedence record carries no status; the next source that
        // does becomes source_of_truth.
        let mut a = record("bookings", "B1", None);
        a.price_cents = Some(9_900);
        let b = record("events", "B1", Some("booking_cancelled"));

        let out = run(&config(), &input(vec![a, b])).unwrap();
        let row = &out.bookings[0];
        assert_eq!(row.status, BookingStatus::Cancelled);
        assert_eq!(row.source_of_truth, "events");
        // But price still comes from the higher-precedence record
        assert_eq!(row.price_cents, Some(9_900));
    }

    #[test]
    fn equal_precedence_breaks_on_ingested_at_ascending() {
        let mut early = record("bookings", "B1", Some("PENDING"));
        early.ingested_at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let mut late = record("bookings", "B1", Some("CANCELLED"));
        late.ingested_at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();

        let out = run(&config(), &input(vec![late, early])).unwrap();
        assert_eq!(out.bookings[0].status, BookingStatus::Pending);
    }

    #[test]
    fn residual_tie_with_conflict_is_error() {
        // Same source, same ingested_at, different status
        let a = record("bookings", "B1", Some("CONFIRMED"));
        let b = record("bookings", "B1", Some("CANCELLED"));

        let err = run(&config(), &input(vec![a, b])).unwrap_err();
        match err {
            PipelineError::AmbiguousConflict { booking_id, field } => {
                assert_eq!(booking_id, "B1");
                assert_eq!(field, "status");
            }
            other => panic!("expected AmbiguousConflict, got {other}"),
        }
    }

    #[test]
    fn residual_tie_with_agreement_is_fine() {
        let a = record("bookings", "B1", Some("CONFIRMED"));
        let b = record("bookings", "B1", Some("CONFIRMED"));

        let out = run(&config(), &input(vec![a, b])).unwrap();
        assert_eq!(out.bookings.len(), 1);
    }

    #[test]
    fn unmapped_status_fails_with_context() {
        let out = run(&config(), &input(vec![record("bookings", "B1", Some("BOOKED"))]));
        match out.unwrap_err() {
            PipelineError::UnmappedStatus { source, booking_id, value } => {
                assert_eq!(source, "bookings");
                assert_eq!(booking_id, "B1");
                assert_eq!(value, "BOOKED");
            }
            other => panic!("expected UnmappedStatus, got {other}"),
        }
    }

    #[test]
    fn group_without_status_is_skipped_and_counted() {
        let out = run(
            &config(),
            &input(vec![
                record("bookings", "B1", None),
                record("events", "B1", None),
                record("bookings", "B2", Some("CONFIRMED")),
            ]),
        )
        .unwrap();

        assert_eq!(out.bookings.len(), 1);
        assert_eq!(out.bookings[0].booking_id, "B2");
        assert_eq!(out.report.skipped_no_status, 1);
        assert_eq!(out.report.groups_total, 2);
    }

    #[test]
    fn missing_booking_id_is_skipped_and_counted() {
        let out = run(
            &config(),
            &input(vec![
                record("bookings", "", Some("CONFIRMED")),
                record("bookings", "  ", Some("CONFIRMED")),
                record("bookings", "B1", Some("CONFIRMED")),
            ]),
        )
        .unwrap();

        assert_eq!(out.bookings.len(), 1);
        assert_eq!(out.report.sources["bookings"].records_in, 3);
        assert_eq!(out.report.sources["bookings"].missing_booking_id, 2);
    }

    #[test]
    fn unknown_source_rejected() {
        let out = run(&config(), &input(vec![record("ota", "B1", Some("CONFIRMED"))]));
        assert!(matches!(out.unwrap_err(), PipelineError::UnknownSource(s) if s == "ota"));
    }

    #[test]
    fn blank_status_treated_as_absent() {
        let blank = record("bookings", "B1", Some("  "));
        let real = record("events", "B1", Some("booking_confirmed"));
        let out = run(&config(), &input(vec![blank, real])).unwrap();
        assert_eq!(out.bookings[0].source_of_truth, "events");
    }

    #[test]
    fn attrs_carried_with_precedence() {
        let mut a = record("bookings", "B1", Some("CONFIRMED"));
        a.attrs.insert("channel".into(), "web".into());
        let mut b = record("events", "B1", None);
        b.attrs.insert("channel".into(), "mobile".into());
        b.attrs.insert("campaign".into(), "summer".into());

        let out = run(&config(), &input(vec![a, b])).unwrap();
        let attrs = &out.bookings[0].attrs;
        assert_eq!(attrs["channel"], "web");
        assert_eq!(attrs["campaign"], "summer");
    }

    #[test]
    fn report_distributions() {
        let out = run(
            &config(),
            &input(vec![
                record("bookings", "B1", Some("CONFIRMED")),
                record("events", "B2", Some("booking_cancelled")),
                record("events", "B3", Some("booking_confirmed")),
            ]),
        )
        .unwrap();

        assert_eq!(out.report.source_of_truth_counts["bookings"], 1);
        assert_eq!(out.report.source_of_truth_counts["events"], 2);
        assert_eq!(out.report.status_counts["confirmed"], 2);
        assert_eq!(out.report.status_counts["cancelled"], 1);
    }

    #[test]
    fn deterministic_under_input_reordering() {
        let records = vec![
            record("hotels", "B2", Some("ok")),
            record("bookings", "B1", Some("CONFIRMED")),
            record("events", "B1", Some("booking_cancelled")),
            record("events", "B2", Some("booking_confirmed")),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let a = run(&config(), &input(records)).unwrap();
        let b = run(&config(), &input(reversed)).unwrap();
        assert_eq!(a.bookings, b.bookings);
        assert_eq!(a.report, b.report);
    }
}
