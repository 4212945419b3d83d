use chrono::Utc;
use shared::{Club, Favorite};
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::live_query::Table;
use super::store::ClubStore;
use crate::backend::storage::{ClubRepository, FavoriteRepository, UserRepository};

impl ClubStore {
    /// Flip the favorite state of a (user, club) pair and return the new state.
    ///
    /// Runs as one serialized write, so concurrent toggles of the same pair
    /// apply one after the other and can never leave two rows behind.
    pub async fn toggle_favorite(&self, user_id: i64, club_id: i64) -> StoreResult<bool> {
        let is_favorite = self
            .run_write("toggle_favorite", move |mut unit| async move {
                let now_favorite = if FavoriteRepository::exists(unit.conn(), user_id, club_id).await? {
                    FavoriteRepository::delete_pair(unit.conn(), user_id, club_id).await?;
                    false
                } else {
                    if UserRepository::find_by_id(unit.conn(), user_id).await?.is_none() {
                        return Err(StoreError::Referential { entity: "user", id: user_id });
                    }
                    if !ClubRepository::exists(unit.conn(), club_id).await? {
                        return Err(StoreError::Referential { entity: "club", id: club_id });
                    }
                    FavoriteRepository::upsert(unit.conn(), user_id, club_id, Utc::now()).await?;
                    true
                };
                unit.touch(Table::Favorites);
                Ok::<_, StoreError>((now_favorite, unit))
            })
            .await?;

        info!("User {} favorite club {}: {}", user_id, club_id, is_favorite);
        Ok(is_favorite)
    }

    pub async fn is_favorite(&self, user_id: i64, club_id: i64) -> StoreResult<bool> {
        Ok(FavoriteRepository::exists(self.pool(), user_id, club_id).await?)
    }

    /// Favorite rows of a user, most recent first
    pub async fn get_favorites_for_user(&self, user_id: i64) -> StoreResult<Vec<Favorite>> {
        Ok(FavoriteRepository::list_by_user(self.pool(), user_id).await?)
    }

    /// Clubs a user saved, most recent first
    pub async fn get_favorite_clubs(&self, user_id: i64) -> StoreResult<Vec<Club>> {
        Ok(FavoriteRepository::favorite_clubs(self.pool(), user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_utils::{new_club, TestEnvironment};

    #[tokio::test]
    async fn test_toggle_is_its_own_inverse() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Шахматы")).await.unwrap();

        assert!(env.store.toggle_favorite(parent, club).await.unwrap());
        assert!(env.store.is_favorite(parent, club).await.unwrap());

        assert!(!env.store.toggle_favorite(parent, club).await.unwrap());
        assert!(!env.store.is_favorite(parent, club).await.unwrap());
        assert!(env.store.get_favorites_for_user(parent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_never_duplicate() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Шахматы")).await.unwrap();

        let (a, b) = tokio::join!(
            env.store.toggle_favorite(parent, club),
            env.store.toggle_favorite(parent, club)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        // one inserted, the other removed again
        assert_ne!(a, b);
        assert!(!env.store.is_favorite(parent, club).await.unwrap());

        let (a, b, c) = tokio::join!(
            env.store.toggle_favorite(parent, club),
            env.store.toggle_favorite(parent, club),
            env.store.toggle_favorite(parent, club)
        );
        assert_eq!([a.unwrap(), b.unwrap(), c.unwrap()].iter().filter(|v| **v).count(), 2);
        assert_eq!(env.store.get_favorites_for_user(parent).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_favorite_clubs_newest_first() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let first = env.store.create_club(new_club(organizer, "Первый")).await.unwrap();
        let second = env.store.create_club(new_club(organizer, "Второй")).await.unwrap();

        env.store.toggle_favorite(parent, first).await.unwrap();
        env.store.toggle_favorite(parent, second).await.unwrap();

        let ids: Vec<i64> = env
            .store
            .get_favorite_clubs(parent)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_toggle_rejects_dangling_references() {
        let env = TestEnvironment::new().await;
        let parent = env.parent().await;

        let err = env.store.toggle_favorite(parent, 99).await.unwrap_err();
        assert!(matches!(err, StoreError::Referential { entity: "club", id: 99 }));
    }
}
