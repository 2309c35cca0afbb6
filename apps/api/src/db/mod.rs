//! SQLite connection pool and schema bootstrap.
//!
//! The store is the single shared mutable resource of the service. Every
//! connection waits up to `busy_timeout` for a held lock before reporting
//! SQLITE_BUSY; `retry::with_retry` absorbs the rarer case where that wait
//! is exceeded.

pub mod retry;

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Legacy session column names and the canonical column each one maps to.
const LEGACY_SESSION_COLUMNS: &[(&str, &str)] = &[
    ("jd", "job_description"),
    ("jd_text", "job_description"),
    ("resume", "resume_text"),
    ("resume_content", "resume_text"),
];

/// Creates the SQLite pool and brings the schema up to date.
pub async fn create_pool(database_url: &str, busy_timeout: Duration) -> Result<SqlitePool> {
    info!("Opening SQLite database {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    info!(
        "SQLite pool established (busy_timeout={}ms)",
        busy_timeout.as_millis()
    );
    Ok(pool)
}

/// Idempotent schema setup. Safe to run on every start.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_sessions (
            id TEXT PRIMARY KEY,
            job_description TEXT NOT NULL,
            resume_text TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL,
            questions TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'created',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_answers (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            audio_path TEXT,
            transcript TEXT,
            score INTEGER,
            feedback TEXT,
            model_answer TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (session_id) REFERENCES interview_sessions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    rename_legacy_columns(pool).await?;
    dedupe_answers(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_answers_session_id ON interview_answers(session_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_status ON interview_sessions(status)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_answers_session_question
        ON interview_answers(session_id, question_id)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Older databases stored the inputs under drifting column names. Rename them
/// once here so the rest of the crate only ever sees the canonical names.
async fn rename_legacy_columns(pool: &SqlitePool) -> Result<()> {
    for (legacy, canonical) in LEGACY_SESSION_COLUMNS {
        if !has_column(pool, "interview_sessions", legacy).await?
            || has_column(pool, "interview_sessions", canonical).await?
        {
            continue;
        }
        sqlx::query(&format!(
            "ALTER TABLE interview_sessions RENAME COLUMN {legacy} TO {canonical}"
        ))
        .execute(pool)
        .await?;
        info!("Renamed legacy column interview_sessions.{legacy} to {canonical}");
    }
    Ok(())
}

/// The unique (session_id, question_id) index cannot be created over duplicates
/// left by older versions. Keep the most recently inserted row for each pair.
async fn dedupe_answers(pool: &SqlitePool) -> Result<()> {
    let removed = sqlx::query(
        r#"
        DELETE FROM interview_answers
        WHERE rowid NOT IN (
            SELECT MAX(rowid) FROM interview_answers GROUP BY session_id, question_id
        )
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    if removed > 0 {
        info!("Removed {removed} duplicate answer rows");
    }
    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}
