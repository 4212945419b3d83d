use chrono::{DateTime, Utc};
use shared::{Club, Favorite};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::club_repository::map_club;

/// Repository for favorite club operations
pub struct FavoriteRepository;

impl FavoriteRepository {
    /// Mark a club as favorite; an existing pair is replaced with a new timestamp
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: i64,
        club_id: i64,
        added_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO favorites (user_id, club_id, added_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(club_id)
        .bind(added_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete_pair<'e, E>(executor: E, user_id: i64, club_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND club_id = ?")
            .bind(user_id)
            .bind(club_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_user<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_club<'e, E>(executor: E, club_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM favorites WHERE club_id = ?")
            .bind(club_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn exists<'e, E>(executor: E, user_id: i64, club_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = ? AND club_id = ?")
            .bind(user_id)
            .bind(club_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }

    /// Raw favorite rows of one user, most recently added first
    pub async fn list_by_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Favorite>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, club_id, added_at
            FROM favorites
            WHERE user_id = ?
            ORDER BY added_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        rows.iter().map(map_favorite).collect()
    }

    /// Clubs a user marked as favorite, most recently added first
    pub async fn favorite_clubs<'e, E>(executor: E, user_id: i64) -> Result<Vec<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.organizer_id, c.name, c.description, c.category, c.city, c.district,
                   c.address, c.age_from, c.age_to, c.price_per_month, c.schedule, c.image_ref,
                   c.verified, c.active, c.rating, c.review_count, c.created_at
            FROM favorites f
            INNER JOIN clubs c ON c.id = f.club_id
            WHERE f.user_id = ?
            ORDER BY f.added_at DESC, f.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        rows.iter().map(map_club).collect()
    }
}

fn map_favorite(row: &SqliteRow) -> Result<Favorite, sqlx::Error> {
    Ok(Favorite {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        club_id: row.try_get("club_id")?,
        added_at: row.try_get("added_at")?,
    })
}
