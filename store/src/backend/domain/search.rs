//! Club search.
//!
//! Both entry points load their candidate set with one query and evaluate the
//! predicates here. City and text matching must be case-insensitive for
//! Cyrillic input, which SQLite's `LIKE` only handles for ASCII.

use shared::{Club, ClubFilter};
use std::cmp::Ordering;
use tracing::{debug, info};

use super::error::StoreResult;
use super::store::ClubStore;
use crate::backend::storage::ClubRepository;

/// Default size of the "top clubs" block on the home screen
pub const DEFAULT_TOP_CLUBS: u32 = 3;

/// Rating descending, then id ascending
pub fn by_rating(a: &Club, b: &Club) -> Ordering {
    b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id))
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Whether `club` passes every predicate set in `filter`.
///
/// The active flag is not checked here; callers pass active clubs only.
pub fn matches_filter(club: &Club, filter: &ClubFilter) -> bool {
    let city = filter.city.trim();
    if !city.is_empty() && !contains_ignore_case(&club.city, &city.to_lowercase()) {
        return false;
    }
    if filter.category.is_some_and(|category| club.category != category) {
        return false;
    }
    if filter.age.is_some_and(|age| !club.accepts_age(age)) {
        return false;
    }
    if filter.max_price.is_some_and(|max| club.price_per_month > max) {
        return false;
    }
    true
}

/// Keep the clubs matching `filter`, ordered by rating
pub fn apply_filter(clubs: Vec<Club>, filter: &ClubFilter) -> Vec<Club> {
    let mut matched: Vec<Club> = clubs
        .into_iter()
        .filter(|club| matches_filter(club, filter))
        .collect();
    matched.sort_by(by_rating);
    matched
}

/// Keep the clubs whose name or description contains `query`, ordered by rating.
///
/// A blank query keeps everything.
pub fn apply_text_query(clubs: Vec<Club>, query: &str) -> Vec<Club> {
    let needle = query.trim().to_lowercase();
    let mut matched: Vec<Club> = clubs
        .into_iter()
        .filter(|club| {
            needle.is_empty()
                || contains_ignore_case(&club.name, &needle)
                || contains_ignore_case(&club.description, &needle)
        })
        .collect();
    matched.sort_by(by_rating);
    matched
}

impl ClubStore {
    /// Structured search over active clubs
    pub async fn search_clubs(&self, filter: &ClubFilter) -> StoreResult<Vec<Club>> {
        debug!("Searching clubs with filter {:?}", filter);

        let candidates = ClubRepository::list_active(self.pool()).await?;
        let clubs = apply_filter(candidates, filter);

        info!("Club search matched {} clubs", clubs.len());
        Ok(clubs)
    }

    /// Free-text search over the name and description of every club
    pub async fn search_clubs_by_text(&self, query: &str) -> StoreResult<Vec<Club>> {
        debug!("Searching clubs by text {:?}", query);

        let candidates = ClubRepository::list_all(self.pool()).await?;
        let clubs = apply_text_query(candidates, query);

        info!("Text search {:?} matched {} clubs", query, clubs.len());
        Ok(clubs)
    }

    /// The `n` best rated active clubs
    pub async fn get_top_clubs(&self, n: u32) -> StoreResult<Vec<Club>> {
        Ok(ClubRepository::list_top_active(self.pool(), n).await?)
    }

    pub async fn get_all_active_clubs(&self) -> StoreResult<Vec<Club>> {
        Ok(ClubRepository::list_active(self.pool()).await?)
    }
}
