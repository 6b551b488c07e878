//! # registry-report
//!
//! Daily export job for the short-term rental registry: runs the fixed
//! reporting queries against the operational database, exports each result
//! set to CSV (paginated fetch, per-page batches merged into one file per
//! query), rewrites staff usernames to Service BC office names in two of
//! the exports, and emails an HTML summary report.
//!
//! ## Modules
//!
//! - `config` - Environment-driven runtime configuration
//! - `db` - Connection pool setup for the registry database
//! - `query` - The fixed query catalogue and the paginated runner
//! - `export` - CSV batch writing and merging
//! - `substitute` - Username-to-organization substitution
//! - `report` - Per-query statistics and HTML rendering
//! - `notify` - Report delivery through the notification service
//! - `run` - Sequential orchestration of the whole job
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod notify;
pub mod query;
pub mod report;
pub mod run;
pub mod substitute;

pub use error::{Error, Result};
