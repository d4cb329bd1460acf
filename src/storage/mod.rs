//! Data storage and persistence

pub mod cache;


pub use cache::{load_record, store_record, MemoryTokenCache, RedisTokenCache, TokenCache, TOKEN_TTL_SECS};

use crate::decision::ChannelKind;
use crate::error::Result;
use crate::types::TokenRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Archive of alerted tokens, kept beyond the cache expiry
#[derive(Clone)]
pub struct TokenArchive {
    pool: SqlitePool,
}

/// One archived token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedToken {
    pub ca: String,
    pub symbol: String,
    /// Rule class of the latest alert
    pub channel: String,
    pub alert: u32,
    /// Merged record as cached at alert time
    pub record: TokenRecord,
    pub first_seen: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenArchive {
    /// Connect to SQLite database (creates if not exists)
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let archive = Self { pool };
        archive.run_migrations().await?;

        Ok(archive)
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let archive = Self { pool };
        archive.run_migrations().await?;

        Ok(archive)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                ca TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                channel TEXT NOT NULL,
                alert INTEGER NOT NULL,
                record TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or refresh the row for an alerted token
    pub async fn upsert(&self, record: &TokenRecord, kind: ChannelKind) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO tokens (ca, symbol, channel, alert, record, first_seen, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ca) DO UPDATE SET
                symbol = excluded.symbol,
                channel = excluded.channel,
                alert = excluded.alert,
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.ca)
        .bind(record.symbol())
        .bind(kind.label())
        .bind(i64::from(record.alert))
        .bind(serde_json::to_string(record)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recently alerted tokens first
    pub async fn recent(&self, limit: i64) -> Result<Vec<ArchivedToken>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT ca, symbol, channel, alert, record, first_seen, updated_at
            FROM tokens
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(|r| r.try_into().ok()).collect())
    }

    pub async fn get(&self, ca: &str) -> Result<Option<ArchivedToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT ca, symbol, channel, alert, record, first_seen, updated_at
            FROM tokens
            WHERE ca = ?
            "#,
        )
        .bind(ca)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.try_into().ok()))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    ca: String,
    symbol: String,
    channel: String,
    alert: i64,
    record: String,
    first_seen: String,
    updated_at: String,
}

impl TryFrom<TokenRow> for ArchivedToken {
    type Error = anyhow::Error;

    fn try_from(row: TokenRow) -> std::result::Result<Self, Self::Error> {
        Ok(ArchivedToken {
            ca: row.ca,
            symbol: row.symbol,
            channel: row.channel,
            alert: u32::try_from(row.alert)?,
            record: serde_json::from_str(&row.record)?,
            first_seen: row.first_seen.parse()?,
            updated_at: row.updated_at.parse()?,
        })
    }
}
