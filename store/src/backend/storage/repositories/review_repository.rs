use chrono::{DateTime, Utc};
use shared::{NewReview, Review};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

const SELECT_REVIEWS: &str =
    "SELECT id, club_id, user_id, rating, text, reply, approved, created_at FROM reviews";

/// Mean rating and count of the approved reviews of one club
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApprovedStats {
    /// `None` when the club has no approved review
    pub mean: Option<f64>,
    pub count: i64,
}

/// Repository for review operations
pub struct ReviewRepository;

impl ReviewRepository {
    /// Store a new review without a reply and return its id
    pub async fn insert<'e, E>(
        executor: E,
        review: &NewReview,
        created_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (club_id, user_id, rating, text, reply, approved, created_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(review.club_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.text)
        .bind(review.approved)
        .bind(created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn set_reply<'e, E>(executor: E, id: i64, reply: &str) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE reviews SET reply = ? WHERE id = ?")
            .bind(reply)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_approved<'e, E>(executor: E, id: i64, approved: bool) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE reviews SET approved = ? WHERE id = ?")
            .bind(approved)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_author<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM reviews WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_club<'e, E>(executor: E, club_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM reviews WHERE club_id = ?")
            .bind(club_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Review>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_REVIEWS} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(map_review).transpose()
    }

    /// Approved reviews of a club, newest first
    pub async fn list_approved_by_club<'e, E>(executor: E, club_id: i64) -> Result<Vec<Review>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "{SELECT_REVIEWS} WHERE club_id = ? AND approved = TRUE ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(club_id).fetch_all(executor).await?;
        rows.iter().map(map_review).collect()
    }

    /// Every review including unapproved ones, newest first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Review>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_REVIEWS} ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(executor).await?;
        rows.iter().map(map_review).collect()
    }

    /// Distinct clubs a user has reviewed
    pub async fn club_ids_by_author<'e, E>(executor: E, user_id: i64) -> Result<Vec<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query("SELECT DISTINCT club_id FROM reviews WHERE user_id = ? ORDER BY club_id")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
        rows.iter().map(|row| row.try_get("club_id")).collect()
    }

    pub async fn approved_stats<'e, E>(executor: E, club_id: i64) -> Result<ApprovedStats, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            r#"
            SELECT AVG(CAST(rating AS REAL)) AS mean, COUNT(*) AS count
            FROM reviews
            WHERE club_id = ? AND approved = TRUE
            "#,
        )
        .bind(club_id)
        .fetch_one(executor)
        .await?;

        Ok(ApprovedStats {
            mean: row.try_get("mean")?,
            count: row.try_get("count")?,
        })
    }
}

fn map_review(row: &SqliteRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        id: row.try_get("id")?,
        club_id: row.try_get("club_id")?,
        user_id: row.try_get("user_id")?,
        rating: row.try_get("rating")?,
        text: row.try_get("text")?,
        reply: row.try_get("reply")?,
        approved: row.try_get("approved")?,
        created_at: row.try_get("created_at")?,
    })
}
