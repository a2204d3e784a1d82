//! `medallion-pipeline` — bronze→silver→gold transformation engines.
//!
//! Pure engine crate: receives pre-loaded bronze records, returns the
//! reconciled silver ledger and the gold KPI rollup. No CLI or storage
//! dependencies.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod rollup;
pub mod status;

pub use config::{PipelineConfig, RevenuePolicy};
pub use error::PipelineError;
pub use model::{BookingStatus, BronzeRecord, CanonicalBooking, DailyCityKpi, ReconcileInput};
pub use reconcile::ReconcileOutput;
pub use rollup::RollupOutput;
