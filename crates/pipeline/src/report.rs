//! Structured run diagnostics. A run never silently drops a record: every
//! skip lands in a counter here.

use std::collections::BTreeMap;

use serde::Serialize;

/// Per-source intake accounting for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub records_in: usize,
    pub missing_booking_id: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub sources: BTreeMap<String, SourceStats>,
    /// Distinct booking_ids seen across all sources.
    pub groups_total: usize,
    /// Silver rows emitted.
    pub rows_written: usize,
    /// Groups excluded because no source supplied a status.
    pub skipped_no_status: usize,
    pub source_of_truth_counts: BTreeMap<String, usize>,
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupReport {
    pub rows_in: usize,
    /// Silver rows lacking booking_date or city, excluded from gold.
    pub skipped_missing_key: usize,
    pub groups_out: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Full-pipeline report, serialized with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup: Option<RollupReport>,
}
