use shared::{ChildProfile, NewChildProfile};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

const SELECT_CHILDREN: &str = r#"
    SELECT id, parent_id, name, birth_date, age, interests, health_info, additional_info
    FROM children
"#;

/// Repository for child profile operations
pub struct ChildRepository;

impl ChildRepository {
    /// Store a new child profile and return its id
    pub async fn insert<'e, E>(executor: E, child: &NewChildProfile) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO children (parent_id, name, birth_date, age, interests, health_info, additional_info)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(child.parent_id)
        .bind(&child.name)
        .bind(child.birth_date)
        .bind(child.age)
        .bind(&child.interests)
        .bind(&child.health_info)
        .bind(&child.additional_info)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update<'e, E>(executor: E, child: &ChildProfile) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET parent_id = ?, name = ?, birth_date = ?, age = ?,
                interests = ?, health_info = ?, additional_info = ?
            WHERE id = ?
            "#,
        )
        .bind(child.parent_id)
        .bind(&child.name)
        .bind(child.birth_date)
        .bind(child.age)
        .bind(&child.interests)
        .bind(&child.health_info)
        .bind(&child.additional_info)
        .bind(child.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM children WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every child of a parent, returning how many were removed
    pub async fn delete_by_parent<'e, E>(executor: E, parent_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM children WHERE parent_id = ?")
            .bind(parent_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<ChildProfile>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CHILDREN} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(map_child).transpose()
    }

    /// Children of one parent in insertion order
    pub async fn list_by_parent<'e, E>(executor: E, parent_id: i64) -> Result<Vec<ChildProfile>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{SELECT_CHILDREN} WHERE parent_id = ? ORDER BY id ASC");
        let rows = sqlx::query(&sql).bind(parent_id).fetch_all(executor).await?;
        rows.iter().map(map_child).collect()
    }
}

fn map_child(row: &SqliteRow) -> Result<ChildProfile, sqlx::Error> {
    Ok(ChildProfile {
        id: row.try_get("id")?,
        parent_id: row.try_get("parent_id")?,
        name: row.try_get("name")?,
        birth_date: row.try_get("birth_date")?,
        age: row.try_get("age")?,
        interests: row.try_get("interests")?,
        health_info: row.try_get("health_info")?,
        additional_info: row.try_get("additional_info")?,
    })
}
