//! Aggregation engine: silver → gold.
//!
//! Groups the canonical ledger by (booking_date, city) and derives KPI
//! measures. Pure and idempotent: rerunning over an unchanged ledger yields
//! byte-identical rows, input order never matters.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::RevenuePolicy;
use crate::model::{BookingStatus, CanonicalBooking, DailyCityKpi};
use crate::report::RollupReport;

#[derive(Debug)]
pub struct RollupOutput {
    /// Gold rows, sorted by (booking_date, city). Sparse: no row for
    /// key pairs with zero bookings.
    pub rows: Vec<DailyCityKpi>,
    pub report: RollupReport,
}

#[derive(Debug, Default)]
struct Acc {
    total: u64,
    confirmed: u64,
    cancelled: u64,
    pending: u64,
    revenue_cents: i64,
    priced_eligible: u64,
}

/// Build the gold rollup from the full silver ledger.
pub fn build(bookings: &[CanonicalBooking], policy: RevenuePolicy) -> RollupOutput {
    let mut groups: BTreeMap<(NaiveDate, String), Acc> = BTreeMap::new();
    let mut skipped_missing_key = 0;

    for booking in bookings {
        let (Some(date), Some(city)) = (booking.booking_date, booking.city.as_deref()) else {
            skipped_missing_key += 1;
            continue;
        };

        let acc = groups.entry((date, city.to_string())).or_default();
        acc.total += 1;
        match booking.status {
            BookingStatus::Confirmed => acc.confirmed += 1,
            BookingStatus::Cancelled => acc.cancelled += 1,
            BookingStatus::Pending => acc.pending += 1,
        }

        // Revenue only over the eligible subset, and only rows that carry
        // a price can contribute to the average.
        if policy.eligible(booking.status) {
            if let Some(price) = booking.price_cents {
                acc.revenue_cents += price;
                acc.priced_eligible += 1;
            }
        }
    }

    let rows: Vec<DailyCityKpi> = groups
        .into_iter()
        .map(|((booking_date, city), acc)| {
            let cancellation_rate = if acc.total == 0 {
                0.0
            } else {
                acc.cancelled as f64 / acc.total as f64
            };
            let avg_booking_price_cents = if acc.priced_eligible == 0 {
                0.0
            } else {
                acc.revenue_cents as f64 / acc.priced_eligible as f64
            };
            DailyCityKpi {
                booking_date,
                city,
                total_bookings: acc.total,
                confirmed_bookings: acc.confirmed,
                cancelled_bookings: acc.cancelled,
                pending_bookings: acc.pending,
                cancellation_rate,
                total_revenue_cents: acc.revenue_cents,
                avg_booking_price_cents,
            }
        })
        .collect();

    let report = RollupReport {
        rows_in: bookings.len(),
        skipped_missing_key,
        groups_out: rows.len(),
    };

    RollupOutput { rows, report }
}
