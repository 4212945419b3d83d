use chrono::{DateTime, Utc};
use shared::{Club, NewClub};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::decode_enum;

const SELECT_CLUBS: &str = r#"
    SELECT id, organizer_id, name, description, category, city, district, address,
           age_from, age_to, price_per_month, schedule, image_ref, verified, active,
           rating, review_count, created_at
    FROM clubs
"#;

/// Repository for club operations
pub struct ClubRepository;

impl ClubRepository {
    /// Store a new club with zeroed rating and return its id
    pub async fn insert<'e, E>(
        executor: E,
        club: &NewClub,
        created_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO clubs (
                organizer_id, name, description, category, city, district, address,
                age_from, age_to, price_per_month, schedule, image_ref, verified, active,
                rating, review_count, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?, 0, 0, ?)
            "#,
        )
        .bind(club.organizer_id)
        .bind(&club.name)
        .bind(&club.description)
        .bind(club.category.as_str())
        .bind(&club.city)
        .bind(&club.district)
        .bind(&club.address)
        .bind(club.age_from)
        .bind(club.age_to)
        .bind(club.price_per_month)
        .bind(&club.schedule)
        .bind(&club.image_ref)
        .bind(club.active)
        .bind(created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite the client-writable columns.
    ///
    /// `rating` and `review_count` are left alone; only [`Self::set_rating`] writes them.
    pub async fn update<'e, E>(executor: E, club: &Club) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE clubs
            SET organizer_id = ?, name = ?, description = ?, category = ?, city = ?,
                district = ?, address = ?, age_from = ?, age_to = ?, price_per_month = ?,
                schedule = ?, image_ref = ?, verified = ?, active = ?, created_at = ?
            WHERE id = ?
            "#,
        )
        .bind(club.organizer_id)
        .bind(&club.name)
        .bind(&club.description)
        .bind(club.category.as_str())
        .bind(&club.city)
        .bind(&club.district)
        .bind(&club.address)
        .bind(club.age_from)
        .bind(club.age_to)
        .bind(club.price_per_month)
        .bind(&club.schedule)
        .bind(&club.image_ref)
        .bind(club.verified)
        .bind(club.active)
        .bind(club.created_at)
        .bind(club.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_verified<'e, E>(executor: E, id: i64, verified: bool) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE clubs SET verified = ? WHERE id = ?")
            .bind(verified)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write the derived aggregate
    pub(crate) async fn set_rating<'e, E>(
        executor: E,
        id: i64,
        rating: f64,
        review_count: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE clubs SET rating = ?, review_count = ? WHERE id = ?")
            .bind(rating)
            .bind(review_count)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM clubs WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CLUBS} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(map_club).transpose()
    }

    /// Active clubs, best rated first
    pub async fn list_active<'e, E>(executor: E) -> Result<Vec<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CLUBS} WHERE active = TRUE ORDER BY rating DESC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(executor).await?;
        rows.iter().map(map_club).collect()
    }

    /// Every club regardless of the active flag, best rated first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CLUBS} ORDER BY rating DESC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(executor).await?;
        rows.iter().map(map_club).collect()
    }

    pub async fn list_top_active<'e, E>(executor: E, limit: u32) -> Result<Vec<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CLUBS} WHERE active = TRUE ORDER BY rating DESC, id ASC LIMIT ?");
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(executor)
            .await?;
        rows.iter().map(map_club).collect()
    }

    pub async fn list_by_organizer<'e, E>(executor: E, organizer_id: i64) -> Result<Vec<Club>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CLUBS} WHERE organizer_id = ? ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(organizer_id)
            .fetch_all(executor)
            .await?;
        rows.iter().map(map_club).collect()
    }

    pub async fn ids_by_organizer<'e, E>(executor: E, organizer_id: i64) -> Result<Vec<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query("SELECT id FROM clubs WHERE organizer_id = ? ORDER BY id ASC")
            .bind(organizer_id)
            .fetch_all(executor)
            .await?;
        rows.iter().map(|row| row.try_get("id")).collect()
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT 1 FROM clubs WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }
}

pub(crate) fn map_club(row: &SqliteRow) -> Result<Club, sqlx::Error> {
    Ok(Club {
        id: row.try_get("id")?,
        organizer_id: row.try_get("organizer_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: decode_enum(row, "category")?,
        city: row.try_get("city")?,
        district: row.try_get("district")?,
        address: row.try_get("address")?,
        age_from: row.try_get("age_from")?,
        age_to: row.try_get("age_to")?,
        price_per_month: row.try_get("price_per_month")?,
        schedule: row.try_get("schedule")?,
        image_ref: row.try_get("image_ref")?,
        verified: row.try_get("verified")?,
        active: row.try_get("active")?,
        rating: row.try_get("rating")?,
        review_count: row.try_get("review_count")?,
        created_at: row.try_get("created_at")?,
    })
}
