//! # Storage Module
//!
//! Durable, keyed persistence for the four record collections.
//!
//! The domain layer talks to storage through [`CollectionStorage`], so the
//! backend can be swapped without touching status or activity logic. The
//! only backend today is the CSV data directory in [`csv`].
//!
//! - Every collection is keyed by record id, with last-write-wins `put`
//!   and idempotent `delete`.
//! - Secondary indexes answer lookups by date, type, parent, trial and
//!   allergen (multi-entry).
//! - A mutation returns only after the data is on disk.

pub mod csv;
pub mod error;
pub mod records;
pub mod traits;

pub use error::StorageError;
pub use records::{AllergenIndex, BabyActivityIndex, FoodTrialIndex, ReactionIndex};
pub use traits::{Collection, CollectionStorage, StoredRecord};
