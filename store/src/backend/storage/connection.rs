use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{info, warn};

use crate::backend::config::StoreConfig;
use crate::backend::storage::repositories::MetaRepository;

/// Version of the table layout created by [`DbConnection::setup_schema`].
///
/// A database carrying any other version is dropped and recreated on open.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

pub(crate) const SCHEMA_VERSION_KEY: &str = "schema_version";

/// DbConnection manages the SQLite pool and the table layout
#[derive(Clone)]
pub struct DbConnection {
    pool: SqlitePool,
}

impl DbConnection {
    /// Open (creating if missing) the database described by `config`
    pub async fn new(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        // every connection to an in-memory url opens its own empty database
        let pool_options = if config.is_in_memory() {
            if config.max_connections > 1 {
                info!("In-memory database, using a single pooled connection");
            }
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        Self::prepare(&pool).await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema to [`CURRENT_SCHEMA_VERSION`], resetting incompatible databases
    async fn prepare(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        let stored_version = MetaRepository::get(pool, SCHEMA_VERSION_KEY)
            .await?
            .map(|raw| raw.parse::<i64>().unwrap_or(-1));

        let needs_reset = match stored_version {
            Some(version) => version != CURRENT_SCHEMA_VERSION,
            // tables without a version marker predate versioning
            None => Self::table_exists(pool, "users").await?,
        };

        if needs_reset {
            warn!(
                stored_version = ?stored_version,
                current_version = CURRENT_SCHEMA_VERSION,
                "Incompatible schema version, resetting database"
            );
            Self::drop_all(pool).await?;
        }

        Self::setup_schema(pool).await?;
        MetaRepository::put(pool, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_string()).await?;

        info!(version = CURRENT_SCHEMA_VERSION, "Database schema ready");
        Ok(())
    }

    async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    /// Drop every table, dependents first
    async fn drop_all(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for table in [
            "favorites",
            "applications",
            "reviews",
            "children",
            "clubs",
            "users",
            "store_meta",
        ] {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            r#"
            CREATE TABLE store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                full_name TEXT NOT NULL,
                phone TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                city TEXT,
                registered_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clubs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                organizer_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                city TEXT NOT NULL,
                district TEXT,
                address TEXT NOT NULL,
                age_from INTEGER NOT NULL CHECK (age_from >= 0),
                age_to INTEGER NOT NULL CHECK (age_to >= age_from),
                price_per_month INTEGER NOT NULL CHECK (price_per_month >= 0),
                schedule TEXT NOT NULL,
                image_ref TEXT,
                verified BOOLEAN NOT NULL DEFAULT FALSE,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                rating REAL NOT NULL DEFAULT 0,
                review_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (organizer_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS children (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                birth_date TEXT NOT NULL,
                age INTEGER NOT NULL,
                interests TEXT,
                health_info TEXT,
                additional_info TEXT,
                FOREIGN KEY (parent_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                club_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
                text TEXT NOT NULL,
                reply TEXT,
                approved BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY (club_id) REFERENCES clubs (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                club_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                child_id INTEGER,
                status TEXT NOT NULL,
                message TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (club_id) REFERENCES clubs (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
                FOREIGN KEY (child_id) REFERENCES children (id) ON DELETE SET NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                club_id INTEGER NOT NULL,
                added_at TEXT NOT NULL,
                UNIQUE (user_id, club_id),
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
                FOREIGN KEY (club_id) REFERENCES clubs (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Foreign key lookups used by cascades and per-owner feeds
        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_clubs_organizer_id ON clubs(organizer_id)",
            "CREATE INDEX IF NOT EXISTS idx_clubs_active_rating ON clubs(active, rating DESC)",
            "CREATE INDEX IF NOT EXISTS idx_children_parent_id ON children(parent_id)",
            "CREATE INDEX IF NOT EXISTS idx_reviews_club_id ON reviews(club_id)",
            "CREATE INDEX IF NOT EXISTS idx_reviews_user_id ON reviews(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_applications_user_id ON applications(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_applications_club_id ON applications(club_id)",
            "CREATE INDEX IF NOT EXISTS idx_favorites_club_id ON favorites(club_id)",
        ] {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> StoreConfig {
        StoreConfig::for_path(&dir.path().join("clubs.db"))
    }

    #[tokio::test]
    async fn test_open_creates_schema_and_version() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = DbConnection::new(&config_for(&dir)).await.expect("Failed to open database");

        let version = MetaRepository::get(db.pool(), SCHEMA_VERSION_KEY)
            .await
            .expect("Failed to read version");
        assert_eq!(version, Some(CURRENT_SCHEMA_VERSION.to_string()));

        for table in ["users", "clubs", "children", "reviews", "applications", "favorites"] {
            assert!(DbConnection::table_exists(db.pool(), table).await.unwrap(), "missing {table}");
        }
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&dir);
        {
            let db = DbConnection::new(&config).await.expect("Failed to open database");
            MetaRepository::put(db.pool(), "marker", "kept").await.unwrap();
            db.pool().close().await;
        }

        let db = DbConnection::new(&config).await.expect("Failed to reopen database");
        let marker = MetaRepository::get(db.pool(), "marker").await.unwrap();
        assert_eq!(marker.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_memory_database_shares_one_connection() {
        let config = StoreConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
            ..StoreConfig::for_path(std::path::Path::new("unused.db"))
        };
        let db = DbConnection::new(&config).await.expect("Failed to open in-memory database");
        assert_eq!(db.pool().options().get_max_connections(), 1);

        MetaRepository::put(db.pool(), "marker", "visible").await.unwrap();
        let reads = concurrent_reads(db.pool()).await;
        assert!(reads.iter().all(|value| value.as_deref() == Some("visible")));
    }

    async fn concurrent_reads(pool: &SqlitePool) -> Vec<Option<String>> {
        let (a, b, c) = tokio::join!(
            MetaRepository::get(pool, "marker"),
            MetaRepository::get(pool, "marker"),
            MetaRepository::get(pool, "marker"),
        );
        vec![a.unwrap(), b.unwrap(), c.unwrap()]
    }

    #[tokio::test]
    async fn test_incompatible_version_resets_database() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = config_for(&dir);
        {
            let db = DbConnection::new(&config).await.expect("Failed to open database");
            MetaRepository::put(db.pool(), "marker", "stale").await.unwrap();
            MetaRepository::put(db.pool(), SCHEMA_VERSION_KEY, "0").await.unwrap();
            db.pool().close().await;
        }

        let db = DbConnection::new(&config).await.expect("Failed to reopen database");
        assert_eq!(MetaRepository::get(db.pool(), "marker").await.unwrap(), None);
        assert_eq!(
            MetaRepository::get(db.pool(), SCHEMA_VERSION_KEY).await.unwrap(),
            Some(CURRENT_SCHEMA_VERSION.to_string())
        );
    }
}
