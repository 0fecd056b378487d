use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// SQLite pragmas applied once at startup.
#[derive(Debug, Clone)]
struct Pragmas {
    busy_timeout_ms: u64,
    journal_mode: &'static str,
    synchronous: &'static str,
}

impl Pragmas {
    fn from_env() -> Self {
        Self {
            busy_timeout_ms: std::env::var("DATABASE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5000),
            journal_mode: normalize_journal_mode(
                &std::env::var("DATABASE_JOURNAL_MODE").unwrap_or_default(),
            ),
            synchronous: normalize_synchronous(
                &std::env::var("DATABASE_SYNCHRONOUS").unwrap_or_default(),
            ),
        }
    }

    fn statements(&self) -> [(&'static str, String); 3] {
        [
            ("busy_timeout", format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms)),
            ("journal_mode", format!("PRAGMA journal_mode = {}", self.journal_mode)),
            ("synchronous", format!("PRAGMA synchronous = {}", self.synchronous)),
        ]
    }
}

/// Handle to the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
}

impl Database {
    /// Open (local file, `:memory:`, remote or embedded replica) and create
    /// the schema.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            let token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), token).build().await?,
            }
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self { db: Arc::new(db) };
        database.configure(&Pragmas::from_env()).await?;
        schema::init_schema(&database.connect()?).await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure(&self, pragmas: &Pragmas) -> Result<()> {
        let conn = self.connect()?;

        for (name, sql) in pragmas.statements() {
            if let Err(error) = conn.execute_batch(&sql).await {
                tracing::warn!(pragma = name, error = %error, "Failed to apply SQLite pragma");
            }
        }

        Ok(())
    }

    /// Pull from the primary when running as an embedded replica.
    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::debug!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragma_values_are_normalized() {
        assert_eq!(normalize_journal_mode("delete"), "DELETE");
        assert_eq!(normalize_journal_mode("bogus"), "WAL");
        assert_eq!(normalize_synchronous(" full "), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn test_file_database_shares_schema_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careerbot.db");
        let config = DatabaseConfig {
            url: format!("file:{}", path.display()),
            auth_token: None,
            local_path: None,
        };

        let db = Database::new(&config).await.unwrap();
        let conn = db.connect().unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM careerbot_meta", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }
}
