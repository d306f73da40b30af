use crate::error::{StorageError, StorageResult};
use crate::source::AuthorizationSource;
use latchkey_core::AuthorizationRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Schema expected by [`SqliteAuthorizationSource`].
///
/// Provided for provisioning tools and tests; the source itself never
/// writes to the database.
pub const AUTHORIZATIONS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS authorizations (
        "key"  TEXT NOT NULL,
        "name" TEXT NOT NULL,
        "type" TEXT NOT NULL
    )
"#;

/// Authorization table stored in SQLite.
///
/// Each lookup runs one query; table order is `rowid` order, so the first
/// inserted row wins when keys repeat.
#[derive(Debug, Clone)]
pub struct SqliteAuthorizationSource {
    pool: SqlitePool,
    url: String,
}

impl SqliteAuthorizationSource {
    /// Create a source for a database URL such as `sqlite:///opt/door/keys.db`.
    ///
    /// The pool connects lazily, so a database that is missing at startup
    /// shows up as an unavailable source on the first lookup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the URL cannot be parsed.
    pub fn connect_lazy(url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Configuration(format!("Invalid database url: {}", e)))?
            .read_only(true)
            .busy_timeout(Duration::from_secs(2));

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Create a source over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            url: "sqlite:<pool>".to_string(),
        }
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AuthorizationSource for SqliteAuthorizationSource {
    async fn find(&self, key: &str) -> StorageResult<Option<AuthorizationRecord>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT "key", "name", "type"
            FROM authorizations
            WHERE "key" = ?
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(key, name, credential_type)| {
            AuthorizationRecord::new(key, name, credential_type)
        }))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn insert(pool: &SqlitePool, key: &str, name: &str, credential_type: &str) {
        sqlx::query(r#"INSERT INTO authorizations ("key", "name", "type") VALUES (?, ?, ?)"#)
            .bind(key)
            .bind(name)
            .bind(credential_type)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let pool = memory_pool().await;
        sqlx::query(AUTHORIZATIONS_SCHEMA).execute(&pool).await.unwrap();
        insert(&pool, "1234", "Alice", "pin").await;
        insert(&pool, "4242424", "Bob", "fob").await;

        let source = SqliteAuthorizationSource::new(pool);
        let record = source.find("4242424").await.unwrap().unwrap();
        assert_eq!(record, AuthorizationRecord::new("4242424", "Bob", "fob"));
        assert!(source.find("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_inserted_row_wins() {
        let pool = memory_pool().await;
        sqlx::query(AUTHORIZATIONS_SCHEMA).execute(&pool).await.unwrap();
        insert(&pool, "1234", "Alice", "pin").await;
        insert(&pool, "1234", "Mallory", "pin").await;

        let source = SqliteAuthorizationSource::new(pool);
        assert_eq!(source.find("1234").await.unwrap().unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn test_missing_table_is_database_error() {
        let source = SqliteAuthorizationSource::new(memory_pool().await);
        assert!(matches!(
            source.find("1234").await,
            Err(StorageError::Database(_))
        ));
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        assert!(matches!(
            SqliteAuthorizationSource::connect_lazy("sqlite://keys.db?mode=bogus"),
            Err(StorageError::Configuration(_))
        ));
    }
}
