//! `medallion-store` — SQLite-backed lakehouse storage.
//!
//! Bronze tables are read-only to this crate's callers except for the
//! dev/test seeding path. Silver and gold are written only via atomic
//! full-replace: a staging table is populated and swapped in inside one
//! transaction, so readers see either the prior snapshot or the complete
//! new one.

pub mod bronze;
pub mod error;
pub mod gold;
pub mod inspect;
pub mod silver;
mod store;

pub use error::StoreError;
pub use store::Store;
