use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use super::{ResultRecord, ResultSink};
use crate::Result;

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS results (
    name TEXT PRIMARY KEY,
    summary TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Results in a local SQLite database, one row per document name.
pub struct SqliteSink {
    pool: Pool<Sqlite>,
}

impl SqliteSink {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn get(&self, name: &str) -> Result<Option<ResultRecord>> {
        let row: Option<(String, String, DateTime<Utc>)> =
            sqlx::query_as("SELECT name, summary, updated_at FROM results WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(name, summary, updated_at)| ResultRecord {
            name,
            summary,
            updated_at,
        }))
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM results")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn put(&self, record: &ResultRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO results (name, summary, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                summary = excluded.summary,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&record.name)
        .bind(&record.summary)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_get() {
        let sink = SqliteSink::open_memory().await.unwrap();

        sink.store("inbox/invoice.pdf", "Values match.").await.unwrap();

        let record = sink.get("invoice.pdf").await.unwrap().unwrap();
        assert_eq!(record.summary, "Values match.");
        assert!(sink.get("inbox/invoice.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_overwrites_same_name() {
        let sink = SqliteSink::open_memory().await.unwrap();

        sink.store("a/invoice.pdf", "first").await.unwrap();
        sink.store("b/invoice.pdf", "second").await.unwrap();

        assert_eq!(sink.count().await.unwrap(), 1);
        assert_eq!(sink.get("invoice.pdf").await.unwrap().unwrap().summary, "second");
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("results.db");

        {
            let sink = SqliteSink::open(&path.to_string_lossy()).await.unwrap();
            sink.store("scan.png", "Only one side found a total.").await.unwrap();
        }

        let reopened = SqliteSink::open(&path.to_string_lossy()).await.unwrap();
        assert!(reopened.get("scan.png").await.unwrap().is_some());
    }
}
