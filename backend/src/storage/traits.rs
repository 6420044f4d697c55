//! # Storage Traits
//!
//! This module defines the storage abstraction that lets the domain layer work
//! with keyed record collections without knowing how they are persisted.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::hash::Hash;

/// The four persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Allergens,
    FoodTrials,
    Reactions,
    BabyActivities,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Allergens,
        Collection::FoodTrials,
        Collection::Reactions,
        Collection::BabyActivities,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Allergens => "allergens",
            Collection::FoodTrials => "foodTrials",
            Collection::Reactions => "reactions",
            Collection::BabyActivities => "babyActivities",
        }
    }

    /// Position of this collection in per-collection arrays
    pub fn slot(&self) -> usize {
        match self {
            Collection::Allergens => 0,
            Collection::FoodTrials => 1,
            Collection::Reactions => 2,
            Collection::BabyActivities => 3,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record that can live in a keyed collection.
///
/// Besides the primary key every record exposes the keys it contributes to
/// each secondary index. A multi-valued field returns one key per element,
/// so a lookup by any single element finds the record.
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// Secondary indexes maintained for this collection
    type Index: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static;

    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn indexes() -> &'static [Self::Index];

    fn index_keys(&self, index: Self::Index) -> Vec<String>;
}

/// Keyed, indexed persistence for one collection.
///
/// Mutations only return once the data is durable. `put` is insert-or-replace
/// (last write wins) and `delete` is idempotent.
#[async_trait]
pub trait CollectionStorage<R: StoredRecord>: Send + Sync {
    /// Read the collection from durable storage, replacing anything in memory.
    /// Returns the number of records loaded.
    async fn load(&self) -> Result<usize>;

    /// Whether `load` has completed successfully
    async fn is_loaded(&self) -> bool;

    /// Insert or replace a record by id
    async fn put(&self, record: &R) -> Result<()>;

    /// Insert or replace several records as one all-or-nothing write
    async fn put_many(&self, records: &[R]) -> Result<()>;

    /// Retrieve a record by id
    async fn get(&self, id: &str) -> Result<Option<R>>;

    /// Snapshot of every record. Ordering is unspecified.
    async fn get_all(&self) -> Result<Vec<R>>;

    /// Remove a record. Returns false if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// All records whose indexed field equals `value`
    async fn query_by_index(&self, index: R::Index, value: &str) -> Result<Vec<R>>;
}
