//! # CSV Table
//!
//! Generic keyed collection persisted as a single CSV file. The whole
//! collection is held in memory; every mutation rewrites the file.
//!
//! ## Durability
//!
//! A write goes to `<file>.csv.tmp`, is flushed and `fsync`ed, atomically
//! renamed over the real file, and the directory entry is synced. Only after
//! that does the in-memory copy change, so a failed write leaves both the file
//! and memory exactly as they were. File I/O runs on the blocking pool.
//!
//! Records are kept in memory in the form they read back from disk (for
//! example millisecond timestamps, blank optional text as `None`), so a
//! lookup returns the same value before and after a restart.
//!
//! ## Indexes
//!
//! Secondary indexes are kept in memory and updated on every put/delete.
//! Multi-valued fields contribute one key per element.

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::connection::CsvConnection;
use crate::storage::error::StorageError;
use crate::storage::traits::{CollectionStorage, StoredRecord};

/// A record that knows how to map itself to and from a flat CSV row
pub trait CsvRecord: StoredRecord {
    type Row: Serialize + DeserializeOwned + Send + 'static;

    fn to_row(&self) -> Result<Self::Row>;

    fn from_row(row: Self::Row) -> Result<Self>;
}

struct SecondaryIndex<I> {
    entries: BTreeMap<(I, String), BTreeSet<String>>,
}

impl<I: Copy + Ord + 'static> SecondaryIndex<I> {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    fn insert<R: StoredRecord<Index = I>>(&mut self, record: &R) {
        for &index in R::indexes() {
            for key in record.index_keys(index) {
                self.entries
                    .entry((index, key))
                    .or_default()
                    .insert(record.id().to_string());
            }
        }
    }

    fn remove<R: StoredRecord<Index = I>>(&mut self, record: &R) {
        for &index in R::indexes() {
            for key in record.index_keys(index) {
                let entry_key = (index, key);
                if let Some(ids) = self.entries.get_mut(&entry_key) {
                    ids.remove(record.id());
                    if ids.is_empty() {
                        self.entries.remove(&entry_key);
                    }
                }
            }
        }
    }

    fn lookup(&self, index: I, key: &str) -> impl Iterator<Item = &String> {
        self.entries
            .get(&(index, key.to_string()))
            .into_iter()
            .flat_map(|ids| ids.iter())
    }
}

struct TableState<R: StoredRecord> {
    loaded: bool,
    records: BTreeMap<String, R>,
    index: SecondaryIndex<R::Index>,
}

impl<R: StoredRecord> TableState<R> {
    fn empty() -> Self {
        Self {
            loaded: false,
            records: BTreeMap::new(),
            index: SecondaryIndex::new(),
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(StorageError::NotLoaded {
                collection: R::COLLECTION,
            }
            .into())
        }
    }

    fn apply_put(&mut self, record: R) {
        if let Some(previous) = self.records.get(record.id()) {
            self.index.remove(previous);
        }
        self.index.insert(&record);
        self.records.insert(record.id().to_string(), record);
    }
}

/// CSV-backed implementation of [`CollectionStorage`]
pub struct CsvTable<R: CsvRecord> {
    path: PathBuf,
    state: Arc<RwLock<TableState<R>>>,
}

impl<R: CsvRecord> Clone for CsvTable<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: CsvRecord> CsvTable<R> {
    /// Create a table for `R`'s collection inside the connection's data directory
    pub fn new(connection: &CsvConnection) -> Self {
        Self {
            path: connection.collection_file_path(R::COLLECTION),
            state: Arc::new(RwLock::new(TableState::empty())),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Read every parsable row from the collection file
    fn read_records(&self) -> Result<Vec<R>> {
        let temp_path = temp_path_for(&self.path);
        if temp_path.exists() {
            // Leftover from an interrupted write; the real file is still intact
            debug!("Removing stale temp file {:?}", temp_path);
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!("Failed to remove stale temp file {:?}: {}", temp_path, e);
            }
        }

        if !self.path.exists() {
            debug!("No file for {} yet at {:?}", R::COLLECTION, self.path);
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let mut csv_reader = ::csv::Reader::from_reader(BufReader::new(file));

        let mut records = Vec::new();
        for (line, result) in csv_reader.deserialize::<R::Row>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable {} row {}: {}", R::COLLECTION, line + 1, e);
                    continue;
                }
            };

            match R::from_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping invalid {} row {}: {}", R::COLLECTION, line + 1, e);
                }
            }
        }

        Ok(records)
    }

    /// Durably replace the collection file with `rows`
    async fn persist(&self, rows: Vec<R::Row>) -> Result<()> {
        let count = rows.len();
        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_rows_atomically(&path, &rows)).await?;

        written.map_err(|source| StorageError::WriteFailure {
            collection: R::COLLECTION,
            path: self.path.clone(),
            source,
        })?;

        debug!("Wrote {} {} rows to {:?}", count, R::COLLECTION, self.path);
        Ok(())
    }
}

fn to_rows<'a, R: CsvRecord>(records: impl Iterator<Item = &'a R>) -> Result<Vec<R::Row>> {
    records.map(R::to_row).collect()
}

/// The record as it reads back from its CSV row
fn canonical<R: CsvRecord>(record: &R) -> Result<R> {
    R::from_row(record.to_row()?)
}

#[async_trait]
impl<R: CsvRecord> CollectionStorage<R> for CsvTable<R> {
    async fn load(&self) -> Result<usize> {
        let records = self.read_records()?;

        let mut fresh = TableState::empty();
        for record in records {
            fresh.apply_put(record);
        }
        fresh.loaded = true;
        let count = fresh.records.len();

        *self.state.write().await = fresh;
        info!("Loaded {} {} from {:?}", count, R::COLLECTION, self.path);
        Ok(count)
    }

    async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    async fn put(&self, record: &R) -> Result<()> {
        self.put_many(std::slice::from_ref(record)).await
    }

    async fn put_many(&self, records: &[R]) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_loaded()?;

        if records.is_empty() {
            return Ok(());
        }

        let records = records.iter().map(canonical).collect::<Result<Vec<R>>>()?;

        let mut next = state.records.clone();
        for record in &records {
            next.insert(record.id().to_string(), record.clone());
        }
        self.persist(to_rows(next.values())?).await?;

        for record in records {
            state.apply_put(record);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<R>> {
        let state = self.state.read().await;
        state.ensure_loaded()?;
        Ok(state.records.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<R>> {
        let state = self.state.read().await;
        state.ensure_loaded()?;
        Ok(state.records.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        state.ensure_loaded()?;

        if !state.records.contains_key(id) {
            return Ok(false);
        }

        let rows = to_rows(state.records.values().filter(|record| record.id() != id))?;
        self.persist(rows).await?;

        if let Some(removed) = state.records.remove(id) {
            state.index.remove(&removed);
        }
        Ok(true)
    }

    async fn query_by_index(&self, index: R::Index, value: &str) -> Result<Vec<R>> {
        let state = self.state.read().await;
        state.ensure_loaded()?;
        Ok(state
            .index
            .lookup(index, value)
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension("csv.tmp")
}

/// Write rows to a temp file, sync it, and atomically move it into place
fn write_rows_atomically<T: Serialize>(path: &Path, rows: &[T]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    {
        let file = File::create(&temp_path)?;
        let mut csv_writer = ::csv::Writer::from_writer(BufWriter::new(file));
        for row in rows {
            csv_writer.serialize(row)?;
        }
        let buffered = csv_writer.into_inner().map_err(|e| e.into_error())?;
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    sync_parent_directory(path)
}

#[cfg(unix)]
fn sync_parent_directory(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_directory(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{at, trial, TestEnvironment};
    use crate::storage::records::FoodTrialIndex;
    use chrono::Duration;
    use shared::FoodTrial;

    #[tokio::test]
    async fn test_put_keeps_what_a_reload_would_read() {
        let env = TestEnvironment::new().unwrap();
        let table = CsvTable::<FoodTrial>::new(&env.connection);
        table.load().await.unwrap();

        let mut toast = trial("t1", &["wheat"], at(2025, 1, 5, 12, 0) + Duration::microseconds(1_234_567));
        toast.notes = Some(String::new());
        toast.amount = Some(String::new());
        table.put(&toast).await.unwrap();

        let in_memory = table.get("t1").await.unwrap().unwrap();
        assert_eq!(in_memory.notes, None);
        assert_eq!(in_memory.amount, None);
        assert_eq!(in_memory.date, at(2025, 1, 5, 12, 0) + Duration::milliseconds(1_234));

        let reopened = CsvTable::<FoodTrial>::new(&env.connection);
        reopened.load().await.unwrap();
        assert_eq!(reopened.get("t1").await.unwrap(), Some(in_memory));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let env = TestEnvironment::new().unwrap();
        let table = CsvTable::<FoodTrial>::new(&env.connection);
        table.load().await.unwrap();
        table.put(&trial("t1", &["wheat"], at(2025, 1, 5, 12, 0))).await.unwrap();

        std::fs::remove_dir_all(&env.base_path).unwrap();
        let err = table
            .put(&trial("t2", &["wheat"], at(2025, 1, 6, 12, 0)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::WriteFailure { .. })
        ));
        assert_eq!(table.get_all().await.unwrap().len(), 1);
        assert!(table
            .query_by_index(FoodTrialIndex::ByDate, "2025-01-06")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_load_clears_stale_temp_file() {
        let env = TestEnvironment::new().unwrap();
        let table = CsvTable::<FoodTrial>::new(&env.connection);
        let stale = temp_path_for(table.file_path());
        std::fs::write(&stale, "half written").unwrap();

        assert_eq!(table.load().await.unwrap(), 0);
        assert!(!stale.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_on_a_multi_thread_runtime() {
        let env = TestEnvironment::new().unwrap();
        let table = CsvTable::<FoodTrial>::new(&env.connection);
        table.load().await.unwrap();

        let mut handles = Vec::new();
        for n in 0..8u32 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("t{}", n);
                table.put(&trial(&id, &["oat"], at(2025, 2, 1, n, 0))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = CsvTable::<FoodTrial>::new(&env.connection);
        assert_eq!(reopened.load().await.unwrap(), 8);
        assert_eq!(
            reopened
                .query_by_index(FoodTrialIndex::ByAllergen, "oat")
                .await
                .unwrap()
                .len(),
            8
        );
    }
}
