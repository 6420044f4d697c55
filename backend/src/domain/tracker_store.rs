//! # Tracker Store
//!
//! The single entry point the presentation layer talks to. It owns the four
//! collection storages, the global config and the live-query hub, and has an
//! explicit lifecycle: construct with [`TrackerStore::new`], bring up with
//! [`TrackerStore::initialize`] (or [`TrackerStore::load`]), and end with
//! [`TrackerStore::shutdown`].
//!
//! Every mutation runs under one commit lock: validate against the latest
//! snapshot, write durably, then publish the new snapshot. Snapshot order is
//! therefore commit order across all collections.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use shared::{
    new_record_id, ActivitySummary, Allergen, AllergenStatus, BabyActivity, BabyActivityType, FoodTrial,
    Reaction,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::activity_summary::{self, infer_sleep_duration};
use super::calendar::{self, TrialDay};
use super::catalog::missing_catalog_entries;
use super::export_service::{DataExport, ExportService};
use super::live_query::{CollectionRecords, CollectionSet, LiveQuery, QueryHub, QueryState, StoreSnapshot};
use super::models::validation::{
    validate_allergen, validate_baby_activity, validate_food_trial, validate_reaction,
};
use crate::storage::csv::{
    AllergenRepository, BabyActivityRepository, CsvConnection, FoodTrialRepository, GlobalConfigRepository,
    GlobalConfigStorage, ReactionRepository,
};
use crate::storage::{
    AllergenIndex, BabyActivityIndex, CollectionStorage, FoodTrialIndex, ReactionIndex, StoredRecord,
};

/// Lifecycle errors of the store facade
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("The tracker store has not been loaded")]
    NotLoaded,
    #[error("The tracker store has been shut down")]
    ShutDown,
}

pub struct TrackerStore {
    connection: CsvConnection,
    allergens: Box<dyn CollectionStorage<Allergen>>,
    food_trials: Box<dyn CollectionStorage<FoodTrial>>,
    reactions: Box<dyn CollectionStorage<Reaction>>,
    baby_activities: Box<dyn CollectionStorage<BabyActivity>>,
    global_config: GlobalConfigRepository,
    export_service: ExportService,
    hub: QueryHub,
    commit_lock: Mutex<()>,
}

impl TrackerStore {
    /// Create a store over a data directory. Nothing is read until `load`.
    pub fn new(connection: CsvConnection) -> Self {
        Self {
            allergens: Box::new(AllergenRepository::new(&connection)),
            food_trials: Box::new(FoodTrialRepository::new(&connection)),
            reactions: Box::new(ReactionRepository::new(&connection)),
            baby_activities: Box::new(BabyActivityRepository::new(&connection)),
            global_config: GlobalConfigRepository::new(connection.clone()),
            export_service: ExportService::new(),
            hub: QueryHub::new(),
            commit_lock: Mutex::new(()),
            connection,
        }
    }

    pub fn connection(&self) -> &CsvConnection {
        &self.connection
    }

    // ----- lifecycle -----

    /// Read every collection from disk and publish the first snapshot.
    ///
    /// On failure the error is also published to live queries.
    pub async fn load(&self) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        self.ensure_open()?;

        info!("Loading tracker data from {:?}", self.connection.base_directory());
        match self.read_all().await {
            Ok(snapshot) => {
                info!(
                    "Loaded {} allergens, {} food trials, {} reactions, {} baby activities",
                    snapshot.allergens.len(),
                    snapshot.food_trials.len(),
                    snapshot.reactions.len(),
                    snapshot.baby_activities.len()
                );
                self.hub.publish_loaded(snapshot);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load tracker data: {:#}", e);
                self.hub.publish_failure(format!("{:#}", e));
                Err(e)
            }
        }
    }

    async fn read_all(&self) -> Result<StoreSnapshot> {
        self.allergens.load().await.context("Failed to load allergens")?;
        self.food_trials.load().await.context("Failed to load food trials")?;
        self.reactions.load().await.context("Failed to load reactions")?;
        self.baby_activities
            .load()
            .await
            .context("Failed to load baby activities")?;

        Ok(StoreSnapshot::new(
            self.allergens.get_all().await?,
            self.food_trials.get_all().await?,
            self.reactions.get_all().await?,
            self.baby_activities.get_all().await?,
        ))
    }

    /// Load if needed, then seed the built-in allergen catalog.
    ///
    /// Safe to call on every start: only missing catalog entries are added,
    /// in one all-or-nothing write. Returns how many were added.
    pub async fn initialize(&self) -> Result<usize> {
        if !self.is_loaded() {
            self.load().await?;
        }

        let _guard = self.commit_lock.lock().await;
        self.ensure_open()?;

        match self.global_config.get_global_config() {
            Ok(config) => debug!("Data format version {}", config.data_format_version),
            Err(e) => warn!("Could not read global config: {:#}", e),
        }

        let existing = self.allergens.get_all().await?;
        let missing = missing_catalog_entries(&existing);
        if missing.is_empty() {
            debug!("Allergen catalog already complete ({} allergens)", existing.len());
            return Ok(0);
        }

        self.put_and_publish(self.allergens.as_ref(), &missing).await?;
        // The catalog is committed; the config only records when that happened
        if let Err(e) = self.global_config.mark_catalog_seeded() {
            warn!("Seeded the catalog but could not record it in the global config: {:#}", e);
        }

        info!("Seeded {} catalog allergens", missing.len());
        Ok(missing.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.hub.snapshot().is_some()
    }

    /// Close all live queries. Later calls fail with [`StoreError::ShutDown`].
    pub async fn shutdown(&self) {
        let _guard = self.commit_lock.lock().await;
        info!(
            "Shutting down tracker store ({} live queries)",
            self.hub.subscriber_count()
        );
        self.hub.close();
    }

    fn ensure_open(&self) -> Result<()> {
        if matches!(self.hub.state(), QueryState::Closed) {
            return Err(StoreError::ShutDown.into());
        }
        Ok(())
    }

    // ----- live queries -----

    pub fn subscribe(&self, selection: CollectionSet) -> LiveQuery {
        self.hub.subscribe(selection)
    }

    /// The latest committed snapshot
    pub fn snapshot(&self) -> Result<Arc<StoreSnapshot>> {
        match self.hub.state() {
            QueryState::Ready(snapshot) => Ok(snapshot),
            QueryState::Closed => Err(StoreError::ShutDown.into()),
            QueryState::Loading | QueryState::Failed(_) => Err(StoreError::NotLoaded.into()),
        }
    }

    async fn put_and_publish<R>(&self, storage: &dyn CollectionStorage<R>, records: &[R]) -> Result<()>
    where
        R: StoredRecord,
        Vec<R>: Into<CollectionRecords>,
    {
        storage.put_many(records).await?;
        self.publish_from(storage).await
    }

    async fn delete_and_publish<R>(&self, storage: &dyn CollectionStorage<R>, id: &str) -> Result<bool>
    where
        R: StoredRecord,
        Vec<R>: Into<CollectionRecords>,
    {
        let removed = storage.delete(id).await?;
        if removed {
            self.publish_from(storage).await?;
        } else {
            debug!("Nothing to delete in {} for id {}", R::COLLECTION, id);
        }
        Ok(removed)
    }

    async fn publish_from<R>(&self, storage: &dyn CollectionStorage<R>) -> Result<()>
    where
        R: StoredRecord,
        Vec<R>: Into<CollectionRecords>,
    {
        let records = storage.get_all().await?;
        self.hub.publish(records.into());
        Ok(())
    }

    // ----- allergens -----

    pub async fn add_allergen(&self, allergen: Allergen) -> Result<Allergen> {
        self.save_allergen(allergen, "Added").await
    }

    /// Replace an allergen by id, creating it if it does not exist
    pub async fn update_allergen(&self, allergen: Allergen) -> Result<Allergen> {
        self.save_allergen(allergen, "Updated").await
    }

    async fn save_allergen(&self, mut allergen: Allergen, verb: &str) -> Result<Allergen> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut allergen.id);
        blank_to_none(&mut allergen.icon);
        blank_to_none(&mut allergen.parent_id);
        if let Err(e) = validate_allergen(&allergen, &snapshot.allergens) {
            warn!("Rejected allergen {}: {}", allergen.id, e);
            return Err(e.into());
        }

        self.put_and_publish(self.allergens.as_ref(), std::slice::from_ref(&allergen))
            .await?;
        info!("{} allergen {} ({})", verb, allergen.id, allergen.name);
        Ok(allergen)
    }

    /// Remove an allergen. Sub-items and trials that reference it are kept.
    pub async fn delete_allergen(&self, allergen_id: &str) -> Result<bool> {
        let _guard = self.commit_lock.lock().await;
        self.snapshot()?;

        let removed = self.delete_and_publish(self.allergens.as_ref(), allergen_id).await?;
        if removed {
            info!("Deleted allergen {}", allergen_id);
        }
        Ok(removed)
    }

    // ----- food trials -----

    pub async fn add_food_trial(&self, mut trial: FoodTrial) -> Result<FoodTrial> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut trial.id);
        trial.date = trial.date.trunc_subsecs(3);
        trial.created_at = commit_time();
        self.commit_food_trial(&snapshot, &mut trial).await?;

        info!("Added food trial {} ({})", trial.id, trial.food_name);
        Ok(trial)
    }

    /// Replace a trial by id, keeping its original `created_at`
    pub async fn update_food_trial(&self, mut trial: FoodTrial) -> Result<FoodTrial> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut trial.id);
        trial.date = trial.date.trunc_subsecs(3);
        trial.created_at = match self.food_trials.get(&trial.id).await? {
            Some(existing) => existing.created_at,
            None => commit_time(),
        };
        self.commit_food_trial(&snapshot, &mut trial).await?;

        info!("Updated food trial {} ({})", trial.id, trial.food_name);
        Ok(trial)
    }

    async fn commit_food_trial(&self, snapshot: &StoreSnapshot, trial: &mut FoodTrial) -> Result<()> {
        blank_to_none(&mut trial.amount);
        blank_to_none(&mut trial.notes);
        if let Err(e) = validate_food_trial(trial, &snapshot.allergens) {
            warn!("Rejected food trial {}: {}", trial.id, e);
            return Err(e.into());
        }
        self.put_and_publish(self.food_trials.as_ref(), std::slice::from_ref(&*trial))
            .await
    }

    /// Remove a trial. Reactions that reference it are kept and ignored by
    /// status derivation.
    pub async fn delete_food_trial(&self, trial_id: &str) -> Result<bool> {
        let _guard = self.commit_lock.lock().await;
        self.snapshot()?;

        let removed = self.delete_and_publish(self.food_trials.as_ref(), trial_id).await?;
        if removed {
            info!("Deleted food trial {}", trial_id);
        }
        Ok(removed)
    }

    // ----- reactions -----

    pub async fn add_reaction(&self, mut reaction: Reaction) -> Result<Reaction> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut reaction.id);
        reaction.created_at = commit_time();
        self.commit_reaction(&snapshot, &mut reaction).await?;

        info!(
            "Added {} reaction {} to food trial {}",
            reaction.severity, reaction.id, reaction.food_trial_id
        );
        Ok(reaction)
    }

    pub async fn update_reaction(&self, mut reaction: Reaction) -> Result<Reaction> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut reaction.id);
        reaction.created_at = match self.reactions.get(&reaction.id).await? {
            Some(existing) => existing.created_at,
            None => commit_time(),
        };
        self.commit_reaction(&snapshot, &mut reaction).await?;

        info!("Updated reaction {}", reaction.id);
        Ok(reaction)
    }

    async fn commit_reaction(&self, snapshot: &StoreSnapshot, reaction: &mut Reaction) -> Result<()> {
        blank_to_none(&mut reaction.notes);
        if let Err(e) = validate_reaction(reaction, &snapshot.food_trials) {
            warn!("Rejected reaction {}: {}", reaction.id, e);
            return Err(e.into());
        }
        self.put_and_publish(self.reactions.as_ref(), std::slice::from_ref(&*reaction))
            .await
    }

    pub async fn delete_reaction(&self, reaction_id: &str) -> Result<bool> {
        let _guard = self.commit_lock.lock().await;
        self.snapshot()?;

        let removed = self.delete_and_publish(self.reactions.as_ref(), reaction_id).await?;
        if removed {
            info!("Deleted reaction {}", reaction_id);
        }
        Ok(removed)
    }

    // ----- baby activities -----

    /// Record an activity. A `wake` without a duration gets the minutes since
    /// the latest sleep at or before it; that value is stored as-is.
    pub async fn add_baby_activity(&self, mut activity: BabyActivity) -> Result<BabyActivity> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.snapshot()?;

        assign_id(&mut activity.id);
        activity.timestamp = activity.timestamp.trunc_subsecs(3);
        activity.created_at = commit_time();

        if activity.activity_type == BabyActivityType::Wake && activity.duration.is_none() {
            activity.duration = infer_sleep_duration(&snapshot.baby_activities, activity.timestamp);
            match activity.duration {
                Some(minutes) => debug!("Inferred {} minutes of sleep for wake {}", minutes, activity.id),
                None => debug!("No sleep before wake {}, leaving duration unset", activity.id),
            }
        }

        self.commit_baby_activity(&mut activity).await?;
        info!(
            "Added {} activity {} at {}",
            activity.activity_type, activity.id, activity.timestamp
        );
        Ok(activity)
    }

    /// Replace an activity by id. A stored sleep duration is never recomputed.
    pub async fn update_baby_activity(&self, mut activity: BabyActivity) -> Result<BabyActivity> {
        let _guard = self.commit_lock.lock().await;
        self.snapshot()?;

        assign_id(&mut activity.id);
        activity.timestamp = activity.timestamp.trunc_subsecs(3);
        activity.created_at = match self.baby_activities.get(&activity.id).await? {
            Some(existing) => existing.created_at,
            None => commit_time(),
        };

        self.commit_baby_activity(&mut activity).await?;
        info!("Updated {} activity {}", activity.activity_type, activity.id);
        Ok(activity)
    }

    async fn commit_baby_activity(&self, activity: &mut BabyActivity) -> Result<()> {
        blank_to_none(&mut activity.notes);
        blank_to_none(&mut activity.feed_amount);
        if let Err(e) = validate_baby_activity(activity) {
            warn!("Rejected baby activity {}: {}", activity.id, e);
            return Err(e.into());
        }
        self.put_and_publish(self.baby_activities.as_ref(), std::slice::from_ref(&*activity))
            .await
    }

    pub async fn delete_baby_activity(&self, activity_id: &str) -> Result<bool> {
        let _guard = self.commit_lock.lock().await;
        self.snapshot()?;

        let removed = self
            .delete_and_publish(self.baby_activities.as_ref(), activity_id)
            .await?;
        if removed {
            info!("Deleted baby activity {}", activity_id);
        }
        Ok(removed)
    }

    // ----- raw lookups -----

    pub async fn get_allergen(&self, id: &str) -> Result<Option<Allergen>> {
        self.allergens.get(id).await
    }

    pub async fn get_food_trial(&self, id: &str) -> Result<Option<FoodTrial>> {
        self.food_trials.get(id).await
    }

    pub async fn get_reaction(&self, id: &str) -> Result<Option<Reaction>> {
        self.reactions.get(id).await
    }

    pub async fn get_baby_activity(&self, id: &str) -> Result<Option<BabyActivity>> {
        self.baby_activities.get(id).await
    }

    pub async fn list_allergens(&self) -> Result<Vec<Allergen>> {
        self.allergens.get_all().await
    }

    pub async fn list_food_trials(&self) -> Result<Vec<FoodTrial>> {
        self.food_trials.get_all().await
    }

    pub async fn list_reactions(&self) -> Result<Vec<Reaction>> {
        self.reactions.get_all().await
    }

    pub async fn list_baby_activities(&self) -> Result<Vec<BabyActivity>> {
        self.baby_activities.get_all().await
    }

    pub async fn find_allergens_by_name(&self, name: &str) -> Result<Vec<Allergen>> {
        self.allergens.query_by_index(AllergenIndex::ByName, name).await
    }

    pub async fn food_trials_for_allergen(&self, allergen_id: &str) -> Result<Vec<FoodTrial>> {
        self.food_trials
            .query_by_index(FoodTrialIndex::ByAllergen, allergen_id)
            .await
    }

    /// Trials on a UTC calendar day
    pub async fn food_trials_on_utc_day(&self, day: NaiveDate) -> Result<Vec<FoodTrial>> {
        self.food_trials
            .query_by_index(FoodTrialIndex::ByDate, &day.format("%Y-%m-%d").to_string())
            .await
    }

    pub async fn reactions_for_trial(&self, trial_id: &str) -> Result<Vec<Reaction>> {
        self.reactions.query_by_index(ReactionIndex::ByTrial, trial_id).await
    }

    pub async fn baby_activities_of_type(&self, activity_type: BabyActivityType) -> Result<Vec<BabyActivity>> {
        self.baby_activities
            .query_by_index(BabyActivityIndex::ByType, activity_type.as_str())
            .await
    }

    /// Activities on a UTC calendar day
    pub async fn baby_activities_on_utc_day(&self, day: NaiveDate) -> Result<Vec<BabyActivity>> {
        self.baby_activities
            .query_by_index(BabyActivityIndex::ByTimestamp, &day.format("%Y-%m-%d").to_string())
            .await
    }

    // ----- derived reads -----

    pub fn status_of(&self, allergen_id: &str) -> Result<AllergenStatus> {
        Ok(self.snapshot()?.status_view().status_of(allergen_id))
    }

    pub fn trial_count_of(&self, allergen_id: &str) -> Result<usize> {
        Ok(self.snapshot()?.status_view().trial_count_of(allergen_id))
    }

    pub fn root_allergens(&self) -> Result<Vec<Allergen>> {
        Ok(owned(self.snapshot()?.status_view().root_allergens()))
    }

    pub fn sub_items_of(&self, root_id: &str) -> Result<Vec<Allergen>> {
        Ok(owned(self.snapshot()?.status_view().sub_items_of(root_id)))
    }

    pub fn parent_of(&self, sub_item_id: &str) -> Result<Option<Allergen>> {
        Ok(self.snapshot()?.status_view().parent_of(sub_item_id).cloned())
    }

    pub fn is_parent_allergen(&self, allergen_id: &str) -> Result<bool> {
        Ok(self.snapshot()?.status_view().is_parent_allergen(allergen_id))
    }

    pub fn allergen_label(&self, allergen_id: &str) -> Result<String> {
        Ok(self.snapshot()?.status_view().allergen_label(allergen_id))
    }

    pub fn trials_for_allergen(&self, allergen_id: &str) -> Result<Vec<FoodTrial>> {
        Ok(owned(self.snapshot()?.status_view().trials_for_allergen(allergen_id)))
    }

    pub fn reactions_for_allergen(&self, allergen_id: &str) -> Result<Vec<Reaction>> {
        Ok(owned(self.snapshot()?.status_view().reactions_for_allergen(allergen_id)))
    }

    pub fn recent_trials(&self, limit: usize) -> Result<Vec<FoodTrial>> {
        Ok(owned(self.snapshot()?.status_view().recent_trials(limit)))
    }

    /// Trials grouped by local calendar day, oldest first
    pub fn trial_calendar(&self) -> Result<Vec<TrialDay>> {
        let snapshot = self.snapshot()?;
        Ok(calendar::trials_by_day(
            &snapshot.food_trials,
            &snapshot.reactions,
            &chrono::Local,
        ))
    }

    pub fn trials_in_month(&self, year: i32, month: u32) -> Result<Vec<TrialDay>> {
        let snapshot = self.snapshot()?;
        Ok(calendar::trials_in_month(
            &snapshot.food_trials,
            &snapshot.reactions,
            year,
            month,
            &chrono::Local,
        ))
    }

    pub fn todays_activity_summary(&self) -> Result<ActivitySummary> {
        Ok(activity_summary::todays_summary(&self.snapshot()?.baby_activities))
    }

    pub fn activity_summary_on(&self, day: NaiveDate) -> Result<ActivitySummary> {
        Ok(activity_summary::summary_for_day(
            &self.snapshot()?.baby_activities,
            day,
            &chrono::Local,
        ))
    }

    pub fn last_activity_of_type(&self, activity_type: BabyActivityType) -> Result<Option<BabyActivity>> {
        let snapshot = self.snapshot()?;
        Ok(activity_summary::last_activity_of_type(&snapshot.baby_activities, activity_type).cloned())
    }

    pub fn last_sleep(&self) -> Result<Option<BabyActivity>> {
        self.last_activity_of_type(BabyActivityType::Sleep)
    }

    /// Activities on a local calendar day, most recent first
    pub fn activities_on(&self, day: NaiveDate) -> Result<Vec<BabyActivity>> {
        let snapshot = self.snapshot()?;
        Ok(owned(activity_summary::activities_on(
            &snapshot.baby_activities,
            day,
            &chrono::Local,
        )))
    }

    /// Timeline of activities grouped by local day, newest day first
    pub fn activity_timeline(&self) -> Result<Vec<(NaiveDate, Vec<BabyActivity>)>> {
        let snapshot = self.snapshot()?;
        let timeline = activity_summary::group_by_day(&snapshot.baby_activities, &chrono::Local)
            .into_iter()
            .map(|(day, activities)| (day, owned(activities)))
            .collect();
        Ok(timeline)
    }

    pub fn export_all_data(&self) -> Result<DataExport> {
        let snapshot = self.snapshot()?;
        Ok(self.export_service.export_all_data(&snapshot))
    }

    pub fn export_service(&self) -> &ExportService {
        &self.export_service
    }
}

fn assign_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = new_record_id();
    }
}

/// Instants are kept at the millisecond precision the CSV columns store
fn commit_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Blank optional text is stored as absent
fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().is_some_and(str::is_empty) {
        *value = None;
    }
}

fn owned<T: Clone>(records: Vec<&T>) -> Vec<T> {
    records.into_iter().cloned().collect()
}
