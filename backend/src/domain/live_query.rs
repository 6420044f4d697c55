//! # Live Queries
//!
//! Consumers subscribe to a set of collections and get the current records
//! plus every later change, without re-issuing queries.
//!
//! The store owns a [`QueryHub`] holding a `tokio::sync::watch` channel of
//! [`QueryState`]. Every committed write publishes a new immutable
//! [`StoreSnapshot`] that shares unchanged collections with the previous one
//! through `Arc`. Publishing never waits on subscribers.
//!
//! A [`LiveQuery`] only wakes for snapshots in which one of its selected
//! collections changed. A slow subscriber may skip intermediate snapshots, but
//! what it sees is always in commit order and always a whole snapshot.

use shared::{Allergen, BabyActivity, FoodTrial, Reaction};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::allergen_status::StatusView;
use crate::storage::Collection;

/// One consistent, immutable view of all four collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Commit sequence; increases by one per published write
    pub sequence: u64,
    versions: [u64; 4],
    pub allergens: Arc<Vec<Allergen>>,
    pub food_trials: Arc<Vec<FoodTrial>>,
    pub reactions: Arc<Vec<Reaction>>,
    pub baby_activities: Arc<Vec<BabyActivity>>,
}

impl StoreSnapshot {
    pub fn new(
        allergens: Vec<Allergen>,
        food_trials: Vec<FoodTrial>,
        reactions: Vec<Reaction>,
        baby_activities: Vec<BabyActivity>,
    ) -> Self {
        Self {
            sequence: 1,
            versions: [1; 4],
            allergens: Arc::new(allergens),
            food_trials: Arc::new(food_trials),
            reactions: Arc::new(reactions),
            baby_activities: Arc::new(baby_activities),
        }
    }

    /// How many times `collection` has changed since load
    pub fn version(&self, collection: Collection) -> u64 {
        self.versions[collection.slot()]
    }

    pub fn status_view(&self) -> StatusView<'_> {
        StatusView::new(&self.allergens, &self.food_trials, &self.reactions)
    }

    /// Place a reloaded snapshot after `previous`: one more commit, and every
    /// collection counts as changed.
    fn continue_from(&mut self, previous: &StoreSnapshot) {
        self.sequence = previous.sequence + 1;
        for (version, before) in self.versions.iter_mut().zip(previous.versions) {
            *version = before + 1;
        }
    }

    /// Next snapshot with one collection replaced
    fn replacing(&self, records: CollectionRecords) -> Self {
        let collection = records.collection();
        let mut next = self.clone();
        next.sequence += 1;
        next.versions[collection.slot()] += 1;

        match records {
            CollectionRecords::Allergens(records) => next.allergens = Arc::new(records),
            CollectionRecords::FoodTrials(records) => next.food_trials = Arc::new(records),
            CollectionRecords::Reactions(records) => next.reactions = Arc::new(records),
            CollectionRecords::BabyActivities(records) => next.baby_activities = Arc::new(records),
        }
        next
    }
}

/// The full, current contents of one collection after a commit
#[derive(Debug, Clone)]
pub enum CollectionRecords {
    Allergens(Vec<Allergen>),
    FoodTrials(Vec<FoodTrial>),
    Reactions(Vec<Reaction>),
    BabyActivities(Vec<BabyActivity>),
}

impl CollectionRecords {
    pub fn collection(&self) -> Collection {
        match self {
            CollectionRecords::Allergens(_) => Collection::Allergens,
            CollectionRecords::FoodTrials(_) => Collection::FoodTrials,
            CollectionRecords::Reactions(_) => Collection::Reactions,
            CollectionRecords::BabyActivities(_) => Collection::BabyActivities,
        }
    }
}

macro_rules! collection_records_from {
    ($($record:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$record>> for CollectionRecords {
                fn from(records: Vec<$record>) -> Self {
                    CollectionRecords::$variant(records)
                }
            }
        )*
    };
}

collection_records_from! {
    Allergen => Allergens,
    FoodTrial => FoodTrials,
    Reaction => Reactions,
    BabyActivity => BabyActivities,
}

/// What the hub currently holds
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// Nothing loaded yet
    Loading,
    Ready(Arc<StoreSnapshot>),
    /// Loading failed; the message is surfaced to every subscriber
    Failed(String),
    /// The store was shut down
    Closed,
}

/// Selector over the four collections
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollectionSet(u8);

impl CollectionSet {
    pub const ALL: CollectionSet = CollectionSet(0b1111);

    pub fn empty() -> Self {
        CollectionSet(0)
    }

    pub fn only(collection: Collection) -> Self {
        Self::empty().with(collection)
    }

    pub fn with(self, collection: Collection) -> Self {
        CollectionSet(self.0 | (1 << collection.slot()))
    }

    pub fn contains(&self, collection: Collection) -> bool {
        self.0 & (1 << collection.slot()) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Collection> + '_ {
        Collection::ALL.into_iter().filter(|collection| self.contains(*collection))
    }
}

impl FromIterator<Collection> for CollectionSet {
    fn from_iter<T: IntoIterator<Item = Collection>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), CollectionSet::with)
    }
}

impl fmt::Debug for CollectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Records of the selected collections. Unselected collections are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRecords {
    pub allergens: Arc<Vec<Allergen>>,
    pub food_trials: Arc<Vec<FoodTrial>>,
    pub reactions: Arc<Vec<Reaction>>,
    pub baby_activities: Arc<Vec<BabyActivity>>,
}

impl QueryRecords {
    fn select(snapshot: &StoreSnapshot, selection: CollectionSet) -> Self {
        fn pick<T>(selected: bool, records: &Arc<Vec<T>>) -> Arc<Vec<T>> {
            if selected {
                Arc::clone(records)
            } else {
                Arc::new(Vec::new())
            }
        }

        Self {
            allergens: pick(selection.contains(Collection::Allergens), &snapshot.allergens),
            food_trials: pick(selection.contains(Collection::FoodTrials), &snapshot.food_trials),
            reactions: pick(selection.contains(Collection::Reactions), &snapshot.reactions),
            baby_activities: pick(
                selection.contains(Collection::BabyActivities),
                &snapshot.baby_activities,
            ),
        }
    }

    /// Status derivation over whatever allergy collections were selected
    pub fn status_view(&self) -> StatusView<'_> {
        StatusView::new(&self.allergens, &self.food_trials, &self.reactions)
    }
}

/// What a subscriber sees: `{records, is_loading, error}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub records: QueryRecords,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Commit sequence the records were taken from (0 before load)
    pub sequence: u64,
}

impl QueryResult {
    fn from_state(state: &QueryState, selection: CollectionSet) -> Self {
        match state {
            QueryState::Loading => Self {
                is_loading: true,
                ..Self::default()
            },
            QueryState::Ready(snapshot) => Self {
                records: QueryRecords::select(snapshot, selection),
                is_loading: false,
                error: None,
                sequence: snapshot.sequence,
            },
            QueryState::Failed(message) => Self {
                error: Some(message.clone()),
                ..Self::default()
            },
            QueryState::Closed => Self {
                error: Some(QueryError::Closed.to_string()),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("The store has been shut down")]
    Closed,
}

/// Identity of what a subscriber last saw, restricted to its selection
#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Loading,
    Ready([Option<u64>; 4]),
    Failed(String),
}

impl Seen {
    fn of(state: &QueryState, selection: CollectionSet) -> Option<Self> {
        match state {
            QueryState::Loading => Some(Seen::Loading),
            QueryState::Ready(snapshot) => {
                let mut versions = [None; 4];
                for collection in selection.iter() {
                    versions[collection.slot()] = Some(snapshot.version(collection));
                }
                Some(Seen::Ready(versions))
            }
            QueryState::Failed(message) => Some(Seen::Failed(message.clone())),
            QueryState::Closed => None,
        }
    }
}

/// A live subscription over a [`CollectionSet`]
#[derive(Debug)]
pub struct LiveQuery {
    receiver: watch::Receiver<QueryState>,
    selection: CollectionSet,
    seen: Option<Seen>,
}

impl LiveQuery {
    pub fn selection(&self) -> CollectionSet {
        self.selection
    }

    /// The latest result, without waiting
    pub fn current(&self) -> QueryResult {
        QueryResult::from_state(&self.receiver.borrow(), self.selection)
    }

    /// Wait for the next result in which a selected collection changed.
    ///
    /// Errors once the store is shut down.
    pub async fn changed(&mut self) -> Result<QueryResult, QueryError> {
        if matches!(*self.receiver.borrow(), QueryState::Closed) {
            return Err(QueryError::Closed);
        }

        loop {
            self.receiver.changed().await.map_err(|_| QueryError::Closed)?;

            let state = self.receiver.borrow_and_update().clone();
            let Some(seen) = Seen::of(&state, self.selection) else {
                return Err(QueryError::Closed);
            };

            if self.seen.as_ref() != Some(&seen) {
                self.seen = Some(seen);
                return Ok(QueryResult::from_state(&state, self.selection));
            }
        }
    }
}

/// Publisher side of the live queries
#[derive(Debug)]
pub struct QueryHub {
    sender: watch::Sender<QueryState>,
}

impl QueryHub {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(QueryState::Loading);
        Self { sender }
    }

    pub fn subscribe(&self, selection: CollectionSet) -> LiveQuery {
        let receiver = self.sender.subscribe();
        let seen = Seen::of(&receiver.borrow(), selection);
        LiveQuery {
            receiver,
            selection,
            seen,
        }
    }

    pub fn state(&self) -> QueryState {
        self.sender.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<StoreSnapshot>> {
        match &*self.sender.borrow() {
            QueryState::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a freshly loaded store.
    ///
    /// A reload continues the sequence and versions of the snapshot it
    /// replaces, so existing subscribers are woken with the reloaded data.
    pub fn publish_loaded(&self, mut snapshot: StoreSnapshot) {
        self.sender.send_modify(|state| {
            if let QueryState::Ready(previous) = state {
                snapshot.continue_from(previous);
            }
            debug!("Publishing loaded snapshot {}", snapshot.sequence);
            *state = QueryState::Ready(Arc::new(snapshot));
        });
    }

    pub fn publish_failure(&self, message: impl Into<String>) {
        self.sender.send_replace(QueryState::Failed(message.into()));
    }

    /// Publish the new contents of one collection after a commit.
    ///
    /// Returns the new commit sequence, or `None` if nothing is loaded.
    pub fn publish(&self, records: CollectionRecords) -> Option<u64> {
        let mut sequence = None;
        self.sender.send_if_modified(|state| match state {
            QueryState::Ready(snapshot) => {
                let next = snapshot.replacing(records);
                sequence = Some(next.sequence);
                *state = QueryState::Ready(Arc::new(next));
                true
            }
            _ => false,
        });

        if let Some(sequence) = sequence {
            debug!("Published snapshot {}", sequence);
        }
        sequence
    }

    /// Close every subscription; `changed()` reports [`QueryError::Closed`]
    pub fn close(&self) {
        self.sender.send_replace(QueryState::Closed);
    }
}

impl Default for QueryHub {
    fn default() -> Self {
        Self::new()
    }
}
