//! Club rating aggregate.
//!
//! `clubs.rating` and `clubs.review_count` always equal the rounded mean and
//! the count of the club's approved reviews. Every review mutation calls
//! [`recompute`] inside its own write unit.

use tracing::debug;

use super::error::StoreResult;
use super::live_query::Table;
use super::store::WriteUnit;
use crate::backend::storage::{ClubRepository, ReviewRepository};

/// Round a mean rating to one decimal place
pub fn round_rating(mean: f64) -> f64 {
    (mean * 10.0).round() / 10.0
}

/// Recompute the aggregate of one club from its approved reviews.
///
/// A club that no longer exists is skipped.
pub(crate) async fn recompute(unit: &mut WriteUnit, club_id: i64) -> StoreResult<(f64, i64)> {
    let stats = ReviewRepository::approved_stats(unit.conn(), club_id).await?;
    let rating = stats.mean.map(round_rating).unwrap_or(0.0);
    let count = stats.count;

    if ClubRepository::set_rating(unit.conn(), club_id, rating, count).await? {
        unit.touch(Table::Clubs);
        debug!("Club {} rating is now {} over {} reviews", club_id, rating, count);
    }

    Ok((rating, count))
}

/// Recompute several clubs, e.g. after a cascade removed reviews from each
pub(crate) async fn recompute_all<I>(unit: &mut WriteUnit, club_ids: I) -> StoreResult<()>
where
    I: IntoIterator<Item = i64>,
{
    for club_id in club_ids {
        recompute(unit, club_id).await?;
    }
    Ok(())
}
