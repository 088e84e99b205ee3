//! Durable corpus tier
//!
//! SQLite-backed system of record. Every analysis ever produced is stored
//! here, and human resolutions are recorded against it, so the corpus
//! doubles as training material for the engines. An FTS5 index over the
//! original and normalized text powers corpus search.

use super::CacheTier;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::info;
use vakya_common::{AnalysisResult, CacheTierId, Error, Result};

pub struct CorpusTier {
    pool: SqlitePool,
}

/// One corpus search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub cache_key: String,
    pub sentence_id: String,
    pub original_text: String,
    pub normalized_slp1: String,
    pub mode: String,
    pub confidence: f64,
    pub disambiguated: bool,
}

/// Aggregate corpus statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_sentences: i64,
    pub disambiguated: i64,
    pub pending_review: i64,
    pub total_accesses: i64,
    pub average_confidence: f64,
}

impl CorpusTier {
    /// Open (creating if needed) the corpus database at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new corpus database: {}", db_path.display());
        } else {
            info!("Opened existing corpus database: {}", db_path.display());
        }

        // WAL allows concurrent readers while the analyzer writes through
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        create_analyses_table(&pool).await?;
        create_fts_index(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Look an analysis up by its sentence id. Returns the cache key along
    /// with the stored result so resolutions can be written back.
    pub async fn find_by_sentence(
        &self,
        sentence_id: &str,
    ) -> Result<Option<(String, AnalysisResult)>> {
        let row = sqlx::query(
            "SELECT cache_key, result_json FROM analyses WHERE sentence_id = ?1",
        )
        .bind(sentence_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let key: String = row.get("cache_key");
                let json: String = row.get("result_json");
                let result = serde_json::from_str(&json)
                    .map_err(|e| Error::Internal(format!("corrupt corpus row {key}: {e}")))?;
                Ok(Some((key, result)))
            }
            None => Ok(None),
        }
    }

    /// Record a resolution (human or otherwise) for an existing row. Unlike
    /// the write-through cache path, failure here is an error: the corpus is
    /// the system of record for resolutions.
    pub async fn record_resolution(&self, key: &str, result: &AnalysisResult) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| Error::Internal(format!("serialize result: {e}")))?;
        let updated = sqlx::query(
            "UPDATE analyses SET result_json = ?1, confidence = ?2, disambiguated = 1, \
             version = ?3, accessed_at = ?4 WHERE cache_key = ?5",
        )
        .bind(&json)
        .bind(result.confidence.overall)
        .bind(result.version as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(key)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("no corpus entry for key {key}")));
        }
        Ok(())
    }

    /// Full-text search over original and normalized text.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        // Quote the user's query so FTS5 operators in it stay literal
        let quoted = format!("\"{}\"", query.replace('"', "\"\""));
        let rows = sqlx::query(
            "SELECT a.cache_key, a.sentence_id, a.original_text, a.normalized_slp1, \
                    a.mode, a.confidence, a.disambiguated \
             FROM analyses_fts f \
             JOIN analyses a ON a.rowid = f.rowid \
             WHERE analyses_fts MATCH ?1 \
             ORDER BY rank LIMIT ?2",
        )
        .bind(quoted)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                cache_key: row.get("cache_key"),
                sentence_id: row.get("sentence_id"),
                original_text: row.get("original_text"),
                normalized_slp1: row.get("normalized_slp1"),
                mode: row.get("mode"),
                confidence: row.get("confidence"),
                disambiguated: row.get::<i64, _>("disambiguated") != 0,
            })
            .collect())
    }

    /// Most recently accessed analyses.
    pub async fn recent(&self, limit: u32) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query(
            "SELECT cache_key, sentence_id, original_text, normalized_slp1, \
                    mode, confidence, disambiguated \
             FROM analyses ORDER BY accessed_at DESC LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                cache_key: row.get("cache_key"),
                sentence_id: row.get("sentence_id"),
                original_text: row.get("original_text"),
                normalized_slp1: row.get("normalized_slp1"),
                mode: row.get("mode"),
                confidence: row.get("confidence"),
                disambiguated: row.get::<i64, _>("disambiguated") != 0,
            })
            .collect())
    }

    pub async fn stats(&self) -> Result<CorpusStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COALESCE(SUM(disambiguated), 0) AS resolved, \
                    COALESCE(SUM(needs_review), 0) AS pending, \
                    COALESCE(SUM(access_count), 0) AS accesses, \
                    COALESCE(AVG(confidence), 0.0) AS avg_conf \
             FROM analyses",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CorpusStats {
            total_sentences: row.get("total"),
            disambiguated: row.get("resolved"),
            pending_review: row.get("pending"),
            total_accesses: row.get("accesses"),
            average_confidence: row.get("avg_conf"),
        })
    }
}

#[async_trait]
impl CacheTier for CorpusTier {
    fn id(&self) -> CacheTierId {
        CacheTierId::Corpus
    }

    async fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let row = sqlx::query("SELECT result_json FROM analyses WHERE cache_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("result_json");
        let result: AnalysisResult = serde_json::from_str(&json)
            .map_err(|e| Error::Internal(format!("corrupt corpus row {key}: {e}")))?;

        sqlx::query(
            "UPDATE analyses SET access_count = access_count + 1, accessed_at = ?1 \
             WHERE cache_key = ?2",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(Some(result))
    }

    async fn put(&self, key: &str, result: &AnalysisResult) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| Error::Internal(format!("serialize result: {e}")))?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO analyses (cache_key, sentence_id, original_text, normalized_slp1, \
                                   mode, result_json, confidence, disambiguated, needs_review, \
                                   version, created_at, accessed_at, access_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, 0) \
             ON CONFLICT(cache_key) DO UPDATE SET \
                 result_json = excluded.result_json, \
                 confidence = excluded.confidence, \
                 disambiguated = excluded.disambiguated, \
                 needs_review = excluded.needs_review, \
                 version = excluded.version, \
                 accessed_at = excluded.accessed_at",
        )
        .bind(key)
        .bind(&result.sentence_id)
        .bind(&result.original_text)
        .bind(&result.normalized_slp1)
        .bind(result.mode.as_str())
        .bind(&json)
        .bind(result.confidence.overall)
        .bind(result.selected.is_some())
        .bind(result.needs_human_review)
        .bind(result.version as i64)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Main analyses table (idempotent).
async fn create_analyses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            cache_key TEXT PRIMARY KEY,
            sentence_id TEXT NOT NULL,
            original_text TEXT NOT NULL,
            normalized_slp1 TEXT NOT NULL,
            mode TEXT NOT NULL,
            result_json TEXT NOT NULL,
            confidence REAL NOT NULL,
            disambiguated INTEGER NOT NULL DEFAULT 0,
            needs_review INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            accessed_at TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_sentence ON analyses(sentence_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_slp1 ON analyses(normalized_slp1)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_accessed ON analyses(accessed_at)")
        .execute(pool)
        .await?;
    Ok(())
}

/// External-content FTS5 index kept in sync by triggers.
async fn create_fts_index(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE VIRTUAL TABLE IF NOT EXISTS analyses_fts USING fts5( \
             original_text, normalized_slp1, content='analyses', content_rowid='rowid')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS analyses_ai AFTER INSERT ON analyses BEGIN \
             INSERT INTO analyses_fts(rowid, original_text, normalized_slp1) \
             VALUES (new.rowid, new.original_text, new.normalized_slp1); \
         END",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS analyses_ad AFTER DELETE ON analyses BEGIN \
             INSERT INTO analyses_fts(analyses_fts, rowid, original_text, normalized_slp1) \
             VALUES ('delete', old.rowid, old.original_text, old.normalized_slp1); \
         END",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS analyses_au AFTER UPDATE ON analyses BEGIN \
             INSERT INTO analyses_fts(analyses_fts, rowid, original_text, normalized_slp1) \
             VALUES ('delete', old.rowid, old.original_text, old.normalized_slp1); \
             INSERT INTO analyses_fts(rowid, original_text, normalized_slp1) \
             VALUES (new.rowid, new.original_text, new.normalized_slp1); \
         END",
    )
    .execute(pool)
    .await?;
    Ok(())
}
