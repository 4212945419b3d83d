use chrono::Utc;
use shared::{NewReview, Review};
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::integrity;
use super::live_query::Table;
use super::rating;
use super::store::ClubStore;
use crate::backend::storage::ReviewRepository;

impl ClubStore {
    /// Publish a review and refresh the club rating in the same commit
    pub async fn create_review(&self, review: NewReview) -> StoreResult<i64> {
        info!(
            "Creating review: club={}, author={}, rating={}",
            review.club_id, review.user_id, review.rating
        );

        let id = self
            .run_write("create_review", move |mut unit| async move {
                integrity::check_new_review(&mut unit, &review).await?;
                let id = ReviewRepository::insert(unit.conn(), &review, Utc::now()).await?;
                unit.touch(Table::Reviews);
                rating::recompute(&mut unit, review.club_id).await?;
                Ok::<_, StoreError>((id, unit))
            })
            .await?;

        info!("Created review with ID: {}", id);
        Ok(id)
    }

    pub async fn delete_review(&self, id: i64) -> StoreResult<()> {
        info!("Deleting review: {}", id);

        self.run_write("delete_review", move |mut unit| async move {
            let review = ReviewRepository::find_by_id(unit.conn(), id)
                .await?
                .ok_or(StoreError::NotFound { entity: "review", id })?;
            ReviewRepository::delete(unit.conn(), id).await?;
            unit.touch(Table::Reviews);
            rating::recompute(&mut unit, review.club_id).await?;
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    /// Organizer reply. A review takes exactly one reply.
    pub async fn set_review_reply(&self, id: i64, reply: String) -> StoreResult<()> {
        info!("Replying to review: {}", id);

        self.run_write("set_review_reply", move |mut unit| async move {
            let review = ReviewRepository::find_by_id(unit.conn(), id)
                .await?
                .ok_or(StoreError::NotFound { entity: "review", id })?;
            if reply.trim().is_empty() {
                return Err(StoreError::validation("reply", "must not be empty"));
            }
            if review.reply.is_some() {
                return Err(StoreError::validation("reply", format!("review {} already has a reply", id)));
            }
            ReviewRepository::set_reply(unit.conn(), id, &reply).await?;
            unit.touch(Table::Reviews);
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    /// Moderation toggle; the club rating only counts approved reviews
    pub async fn set_review_approved(&self, id: i64, approved: bool) -> StoreResult<()> {
        info!("Setting review {} approved={}", id, approved);

        self.run_write("set_review_approved", move |mut unit| async move {
            let review = ReviewRepository::find_by_id(unit.conn(), id)
                .await?
                .ok_or(StoreError::NotFound { entity: "review", id })?;
            ReviewRepository::set_approved(unit.conn(), id, approved).await?;
            unit.touch(Table::Reviews);
            rating::recompute(&mut unit, review.club_id).await?;
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    pub async fn get_review(&self, id: i64) -> StoreResult<Review> {
        ReviewRepository::find_by_id(self.pool(), id)
            .await?
            .ok_or(StoreError::NotFound { entity: "review", id })
    }

    /// Approved reviews of a club, newest first
    pub async fn get_reviews_for_club(&self, club_id: i64) -> StoreResult<Vec<Review>> {
        Ok(ReviewRepository::list_approved_by_club(self.pool(), club_id).await?)
    }

    /// Every review including unapproved ones, for moderation
    pub async fn get_all_reviews(&self) -> StoreResult<Vec<Review>> {
        Ok(ReviewRepository::list_all(self.pool()).await?)
    }
}
