//! # Domain Module
//!
//! Everything above raw storage: live queries, status and activity
//! derivation, the built-in catalog, export, and the [`TrackerStore`]
//! facade that ties them together.

pub mod activity_summary;
pub mod allergen_status;
pub mod calendar;
pub mod catalog;
pub mod export_service;
pub mod live_query;
pub mod models;
pub mod tracker_store;

pub use allergen_status::{StatusView, SAFE_TRIAL_THRESHOLD};
pub use calendar::TrialDay;
pub use export_service::{DataExport, ExportService};
pub use live_query::{
    CollectionSet, LiveQuery, QueryError, QueryHub, QueryRecords, QueryResult, QueryState, StoreSnapshot,
};
pub use models::ValidationError;
pub use tracker_store::{StoreError, TrackerStore};
