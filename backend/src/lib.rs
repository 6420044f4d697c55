//! # Allergy Tracker Backend
//!
//! Local-first store for food-allergen introduction trials, reactions and
//! baby care activities, plus the engines that derive allergen status and
//! daily activity summaries from them.
//!
//! ## Layers
//!
//! - [`storage`]: durable keyed collections (one CSV file each) with
//!   secondary indexes and a YAML global config.
//! - [`domain`]: live queries, status derivation, activity aggregation,
//!   export and the [`TrackerStore`] facade.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! let store = allergy_tracker::open_store(None)?;
//! store.initialize().await?;
//! println!("milk is {:?}", store.status_of("milk")?);
//! store.shutdown().await;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::path::Path;

pub mod domain;
pub mod storage;

pub use domain::{CollectionSet, LiveQuery, QueryResult, StoreError, TrackerStore, ValidationError};
pub use storage::csv::CsvConnection;
pub use storage::StorageError;

/// Build a store over `data_dir`, or the default data directory when `None`.
///
/// Nothing is read yet; call [`TrackerStore::initialize`] next.
pub fn open_store(data_dir: Option<&Path>) -> Result<TrackerStore> {
    let connection = match data_dir {
        Some(dir) => CsvConnection::new(dir)?,
        None => CsvConnection::new_default()?,
    };
    Ok(TrackerStore::new(connection))
}
