use chrono::Utc;
use shared::{Club, NewClub};
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::integrity::{self, CascadeReport};
use super::live_query::Table;
use super::store::ClubStore;
use crate::backend::storage::ClubRepository;

impl ClubStore {
    /// Create a club owned by an organizer or admin. New clubs start unverified
    /// with no rating.
    pub async fn create_club(&self, club: NewClub) -> StoreResult<i64> {
        info!("Creating club: name={}, organizer={}", club.name, club.organizer_id);

        let id = self
            .run_write("create_club", move |mut unit| async move {
                integrity::check_new_club(&mut unit, &club).await?;
                let id = ClubRepository::insert(unit.conn(), &club, Utc::now()).await?;
                unit.touch(Table::Clubs);
                Ok::<_, StoreError>((id, unit))
            })
            .await?;

        info!("Created club with ID: {}", id);
        Ok(id)
    }

    /// Overwrite the client-editable fields of a club.
    ///
    /// `verified` keeps its stored value (see [`ClubStore::set_club_verified`]),
    /// and `rating`/`review_count` are owned by the rating aggregate, so the
    /// values carried by `club` for those three fields are ignored.
    pub async fn update_club(&self, club: Club) -> StoreResult<()> {
        info!("Updating club: {}", club.id);

        self.run_write("update_club", move |mut unit| async move {
            let stored = ClubRepository::find_by_id(unit.conn(), club.id)
                .await?
                .ok_or(StoreError::NotFound { entity: "club", id: club.id })?;
            integrity::check_club_update(&mut unit, &club).await?;

            let club = Club {
                verified: stored.verified,
                rating: stored.rating,
                review_count: stored.review_count,
                ..club
            };
            ClubRepository::update(unit.conn(), &club).await?;
            unit.touch(Table::Clubs);
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    /// Delete a club with its applications, reviews and favorites
    pub async fn delete_club(&self, id: i64) -> StoreResult<CascadeReport> {
        info!("Deleting club: {}", id);

        self.run_write("delete_club", move |mut unit| async move {
            let report = integrity::cascade_delete_club(&mut unit, id)
                .await?
                .ok_or(StoreError::NotFound { entity: "club", id })?;
            Ok::<_, StoreError>((report, unit))
        })
        .await
    }

    /// Admin moderation flag
    pub async fn set_club_verified(&self, id: i64, verified: bool) -> StoreResult<()> {
        info!("Setting club {} verified={}", id, verified);

        self.run_write("set_club_verified", move |mut unit| async move {
            if !ClubRepository::set_verified(unit.conn(), id, verified).await? {
                return Err(StoreError::NotFound { entity: "club", id });
            }
            unit.touch(Table::Clubs);
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    pub async fn get_club(&self, id: i64) -> StoreResult<Club> {
        ClubRepository::find_by_id(self.pool(), id)
            .await?
            .ok_or(StoreError::NotFound { entity: "club", id })
    }

    /// Clubs owned by an organizer, active or not
    pub async fn get_clubs_by_organizer(&self, organizer_id: i64) -> StoreResult<Vec<Club>> {
        Ok(ClubRepository::list_by_organizer(self.pool(), organizer_id).await?)
    }
}
