//! Live queries: subscribable result sets re-evaluated after each commit.
//!
//! A mutation records the tables it touched in its [`ChangeSet`]. After the
//! commit, every registered [`QueryShape`] reading one of those tables is
//! evaluated again and the fresh [`Snapshot`] is pushed to its subscribers.
//! Shapes shared by several subscribers are evaluated once per commit.

use shared::{Application, ChildProfile, Club, ClubFilter, Review, User};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::StoreResult;
use super::search::{apply_filter, apply_text_query};
use crate::backend::storage::{
    ApplicationRepository, ChildRepository, ClubRepository, FavoriteRepository, ReviewRepository,
    UserRepository,
};

/// Persisted table a mutation can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Clubs,
    Children,
    Reviews,
    Applications,
    Favorites,
}

/// Tables modified by one committed mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<Table>);

impl ChangeSet {
    pub fn insert(&mut self, table: Table) {
        self.0.insert(table);
    }

    pub fn contains(&self, table: Table) -> bool {
        self.0.contains(&table)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn affects(&self, shape: &QueryShape) -> bool {
        shape.reads().iter().any(|table| self.0.contains(table))
    }
}

impl FromIterator<Table> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A query that can be subscribed to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryShape {
    ActiveClubs,
    TopClubs(u32),
    SearchClubs(ClubFilter),
    SearchClubsByText(String),
    ClubsByOrganizer(i64),
    ReviewsForClub(i64),
    AllReviews,
    ApplicationsForUser(i64),
    ApplicationsForClub(i64),
    ApplicationsForOrganizer(i64),
    FavoriteClubs(i64),
    ChildrenOfParent(i64),
    AllUsers,
}

impl QueryShape {
    /// Tables whose modification can change the result
    pub fn reads(&self) -> &'static [Table] {
        match self {
            QueryShape::ActiveClubs
            | QueryShape::TopClubs(_)
            | QueryShape::SearchClubs(_)
            | QueryShape::SearchClubsByText(_)
            | QueryShape::ClubsByOrganizer(_) => &[Table::Clubs],
            QueryShape::ReviewsForClub(_) | QueryShape::AllReviews => &[Table::Reviews],
            QueryShape::ApplicationsForUser(_) | QueryShape::ApplicationsForClub(_) => {
                &[Table::Applications]
            }
            // ownership of the joined club can change too
            QueryShape::ApplicationsForOrganizer(_) => &[Table::Applications, Table::Clubs],
            QueryShape::FavoriteClubs(_) => &[Table::Favorites, Table::Clubs],
            QueryShape::ChildrenOfParent(_) => &[Table::Children],
            QueryShape::AllUsers => &[Table::Users],
        }
    }

    /// Run the query against committed state
    pub async fn evaluate(&self, pool: &SqlitePool) -> StoreResult<Snapshot> {
        let snapshot = match self {
            QueryShape::ActiveClubs => Snapshot::Clubs(ClubRepository::list_active(pool).await?),
            QueryShape::TopClubs(n) => {
                Snapshot::Clubs(ClubRepository::list_top_active(pool, *n).await?)
            }
            QueryShape::SearchClubs(filter) => {
                let candidates = ClubRepository::list_active(pool).await?;
                Snapshot::Clubs(apply_filter(candidates, filter))
            }
            QueryShape::SearchClubsByText(query) => {
                let candidates = ClubRepository::list_all(pool).await?;
                Snapshot::Clubs(apply_text_query(candidates, query))
            }
            QueryShape::ClubsByOrganizer(organizer_id) => {
                Snapshot::Clubs(ClubRepository::list_by_organizer(pool, *organizer_id).await?)
            }
            QueryShape::ReviewsForClub(club_id) => {
                Snapshot::Reviews(ReviewRepository::list_approved_by_club(pool, *club_id).await?)
            }
            QueryShape::AllReviews => Snapshot::Reviews(ReviewRepository::list_all(pool).await?),
            QueryShape::ApplicationsForUser(user_id) => {
                Snapshot::Applications(ApplicationRepository::list_by_user(pool, *user_id).await?)
            }
            QueryShape::ApplicationsForClub(club_id) => {
                Snapshot::Applications(ApplicationRepository::list_by_club(pool, *club_id).await?)
            }
            QueryShape::ApplicationsForOrganizer(organizer_id) => Snapshot::Applications(
                ApplicationRepository::list_for_organizer(pool, *organizer_id).await?,
            ),
            QueryShape::FavoriteClubs(user_id) => {
                Snapshot::Clubs(FavoriteRepository::favorite_clubs(pool, *user_id).await?)
            }
            QueryShape::ChildrenOfParent(parent_id) => {
                Snapshot::Children(ChildRepository::list_by_parent(pool, *parent_id).await?)
            }
            QueryShape::AllUsers => Snapshot::Users(UserRepository::list_all(pool).await?),
        };
        Ok(snapshot)
    }
}

/// Result of evaluating a [`QueryShape`]
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Clubs(Vec<Club>),
    Reviews(Vec<Review>),
    Applications(Vec<Application>),
    Children(Vec<ChildProfile>),
    Users(Vec<User>),
}

impl Snapshot {
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Clubs(items) => items.len(),
            Snapshot::Reviews(items) => items.len(),
            Snapshot::Applications(items) => items.len(),
            Snapshot::Children(items) => items.len(),
            Snapshot::Users(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_clubs(self) -> Option<Vec<Club>> {
        match self {
            Snapshot::Clubs(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_reviews(self) -> Option<Vec<Review>> {
        match self {
            Snapshot::Reviews(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_applications(self) -> Option<Vec<Application>> {
        match self {
            Snapshot::Applications(items) => Some(items),
            _ => None,
        }
    }
}

struct Registration {
    shape: QueryShape,
    sender: mpsc::UnboundedSender<Snapshot>,
}

/// Registry of live subscriptions
#[derive(Default)]
pub(crate) struct LiveQueries {
    next_id: AtomicU64,
    registrations: Mutex<HashMap<u64, Registration>>,
}

impl LiveQueries {
    /// Register `shape` and queue `initial` as its first snapshot
    pub(crate) fn register(self: &Arc<Self>, shape: QueryShape, initial: Snapshot) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        // the receiver is alive, so this cannot fail
        let _ = sender.send(initial);

        self.lock().insert(id, Registration { shape, sender });

        Subscription {
            id,
            receiver,
            registry: Arc::clone(self),
        }
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Registration>> {
        // a poisoned map is still structurally valid
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push fresh snapshots to every subscription affected by `changes`
    pub(crate) async fn publish(&self, pool: &SqlitePool, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }

        let targets: Vec<(u64, QueryShape, mpsc::UnboundedSender<Snapshot>)> = self
            .lock()
            .iter()
            .filter(|(_, registration)| changes.affects(&registration.shape))
            .map(|(id, registration)| (*id, registration.shape.clone(), registration.sender.clone()))
            .collect();

        if targets.is_empty() {
            return;
        }

        let mut evaluated: HashMap<QueryShape, Snapshot> = HashMap::new();
        let mut closed = Vec::new();

        for (id, shape, sender) in targets {
            if sender.is_closed() {
                closed.push(id);
                continue;
            }

            if !evaluated.contains_key(&shape) {
                match shape.evaluate(pool).await {
                    Ok(snapshot) => {
                        evaluated.insert(shape.clone(), snapshot);
                    }
                    Err(e) => {
                        warn!("Failed to re-evaluate live query {:?}: {}", shape, e);
                        continue;
                    }
                }
            }

            if let Some(snapshot) = evaluated.get(&shape) {
                if sender.send(snapshot.clone()).is_err() {
                    closed.push(id);
                }
            }
        }

        if !closed.is_empty() {
            debug!("Pruning {} closed live queries", closed.len());
            let mut registrations = self.lock();
            for id in closed {
                registrations.remove(&id);
            }
        }
    }
}

/// Handle to a live query.
///
/// Yields the current snapshot first, then one snapshot per relevant commit.
/// Dropping the handle cancels the subscription.
pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    registry: Arc<LiveQueries>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next snapshot. Returns `None` once cancelled.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Take a snapshot that is already queued without waiting
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving snapshots; already queued ones are discarded
    pub fn cancel(&mut self) {
        self.registry.remove(self.id);
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
