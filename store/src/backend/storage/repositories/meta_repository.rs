use sqlx::{Executor, Row, Sqlite};

/// Repository for the `store_meta` key/value table
pub struct MetaRepository;

impl MetaRepository {
    pub async fn get<'e, E>(executor: E, key: &str) -> Result<Option<String>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT value FROM store_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?;

        row.map(|r| r.try_get("value")).transpose()
    }

    /// Insert or replace a value
    pub async fn put<'e, E>(executor: E, key: &str, value: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT OR REPLACE INTO store_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Write `value` only if `key` is absent.
    ///
    /// Returns true when this call created the row. As the first statement of a
    /// transaction this takes the write lock, so two writers cannot both claim.
    pub async fn claim<'e, E>(executor: E, key: &str, value: &str) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("INSERT INTO store_meta (key, value) VALUES (?, ?) ON CONFLICT (key) DO NOTHING")
            .bind(key)
            .bind(value)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
