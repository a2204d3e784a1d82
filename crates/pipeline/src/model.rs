use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bronze (input)
// ---------------------------------------------------------------------------

/// A single raw record from one source system's bronze table.
///
/// Field values are as received: only `booking_id` presence is checked
/// downstream, everything else may be null. Prices are integer minor units.
#[derive(Debug, Clone)]
pub struct BronzeRecord {
    pub source_system: String,
    pub booking_id: String,
    pub status_raw: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub price_cents: Option<i64>,
    pub ingested_at: DateTime<Utc>,
    /// Carried-through descriptive columns outside the fixed contract.
    pub attrs: BTreeMap<String, String>,
}

/// Pre-loaded bronze records grouped by source-system name.
#[derive(Debug, Default)]
pub struct ReconcileInput {
    pub records: BTreeMap<String, Vec<BronzeRecord>>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Canonical booking status. Closed set — raw source vocabularies are
/// normalized into these three states and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [Self::Pending, Self::Confirmed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a canonical (already-normalized) status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Silver
// ---------------------------------------------------------------------------

/// A reconciled booking — exactly one per `booking_id` in the silver ledger.
/// Rows are written whole on each run, never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalBooking {
    pub booking_id: String,
    pub status: BookingStatus,
    /// Source system that supplied the winning status value.
    pub source_of_truth: String,
    pub booking_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub price_cents: Option<i64>,
    pub attrs: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Gold
// ---------------------------------------------------------------------------

/// One KPI row per (booking_date, city) pair present in silver.
///
/// `cancellation_rate` and `avg_booking_price_cents` are stored at full
/// precision; rounding happens at the presentation boundary only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCityKpi {
    pub booking_date: NaiveDate,
    pub city: String,
    pub total_bookings: u64,
    pub confirmed_bookings: u64,
    pub cancelled_bookings: u64,
    pub pending_bookings: u64,
    pub cancellation_rate: f64,
    pub total_revenue_cents: i64,
    pub avg_booking_price_cents: f64,
}
