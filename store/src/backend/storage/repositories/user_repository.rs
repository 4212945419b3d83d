use chrono::{DateTime, Utc};
use shared::{NewUser, User, UserRole};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::decode_enum;

const SELECT_USERS: &str =
    "SELECT id, role, full_name, phone, password, city, registered_at FROM users";

/// Repository for user operations
pub struct UserRepository;

impl UserRepository {
    /// Store a new user and return its id
    pub async fn insert<'e, E>(
        executor: E,
        user: &NewUser,
        registered_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO users (role, full_name, phone, password, city, registered_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.role.as_str())
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(&user.city)
        .bind(registered_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite every column but the id. Returns false if the row is missing.
    pub async fn update<'e, E>(executor: E, user: &User) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET role = ?, full_name = ?, phone = ?, password = ?, city = ?, registered_at = ?
            WHERE id = ?
            "#,
        )
        .bind(user.role.as_str())
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(&user.city)
        .bind(user.registered_at)
        .bind(user.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_USERS} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_phone<'e, E>(executor: E, phone: &str) -> Result<Option<User>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_USERS} WHERE phone = ? LIMIT 1");
        let row = sqlx::query(&sql).bind(phone).fetch_optional(executor).await?;
        row.as_ref().map(map_user).transpose()
    }

    /// All users ordered by id
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<User>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_USERS} ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(executor).await?;
        rows.iter().map(map_user).collect()
    }

    pub async fn list_by_role<'e, E>(executor: E, role: UserRole) -> Result<Vec<User>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_USERS} WHERE role = ? ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(role.as_str())
            .fetch_all(executor)
            .await?;
        rows.iter().map(map_user).collect()
    }
}

fn map_user(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        role: decode_enum(row, "role")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        password: row.try_get("password")?,
        city: row.try_get("city")?,
        registered_at: row.try_get("registered_at")?,
    })
}
