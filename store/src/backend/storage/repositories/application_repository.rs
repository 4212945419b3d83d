use chrono::{DateTime, Utc};
use shared::{Application, ApplicationStatus, NewApplication};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::decode_enum;

const SELECT_APPLICATIONS: &str = r#"
    SELECT a.id, a.club_id, a.user_id, a.child_id, a.status, a.message, a.created_at
    FROM applications a
"#;

/// Repository for enrollment application operations
pub struct ApplicationRepository;

impl ApplicationRepository {
    /// Store a new application in the `PENDING` state and return its id
    pub async fn insert<'e, E>(
        executor: E,
        application: &NewApplication,
        created_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO applications (club_id, user_id, child_id, status, message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(application.club_id)
        .bind(application.user_id)
        .bind(application.child_id)
        .bind(ApplicationStatus::Pending.as_str())
        .bind(&application.message)
        .bind(created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE applications SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Detach a deleted child from the applications filed for it
    pub async fn clear_child<'e, E>(executor: E, child_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE applications SET child_id = NULL WHERE child_id = ?")
            .bind(child_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_user<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM applications WHERE user_id = ?")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_club<'e, E>(executor: E, club_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM applications WHERE club_id = ?")
            .bind(club_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Application>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_APPLICATIONS} WHERE a.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(map_application).transpose()
    }

    /// Applications filed by one user, newest first
    pub async fn list_by_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Application>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_APPLICATIONS} WHERE a.user_id = ? ORDER BY a.created_at DESC, a.id DESC");
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(executor).await?;
        rows.iter().map(map_application).collect()
    }

    pub async fn list_by_club<'e, E>(executor: E, club_id: i64) -> Result<Vec<Application>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_APPLICATIONS} WHERE a.club_id = ? ORDER BY a.created_at DESC, a.id DESC");
        let rows = sqlx::query(&sql).bind(club_id).fetch_all(executor).await?;
        rows.iter().map(map_application).collect()
    }

    /// Applications to any club the organizer currently owns, newest first
    pub async fn list_for_organizer<'e, E>(
        executor: E,
        organizer_id: i64,
    ) -> Result<Vec<Application>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"{SELECT_APPLICATIONS}
            INNER JOIN clubs c ON c.id = a.club_id
            WHERE c.organizer_id = ?
            ORDER BY a.created_at DESC, a.id DESC"#
        );
        let rows = sqlx::query(&sql)
            .bind(organizer_id)
            .fetch_all(executor)
            .await?;
        rows.iter().map(map_application).collect()
    }
}

fn map_application(row: &SqliteRow) -> Result<Application, sqlx::Error> {
    Ok(Application {
        id: row.try_get("id")?,
        club_id: row.try_get("club_id")?,
        user_id: row.try_get("user_id")?,
        child_id: row.try_get("child_id")?,
        status: decode_enum(row, "status")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}
