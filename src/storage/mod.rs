//! SQLite-backed profile store.
//!
//! One table per marketplace role (`client_profiles`, `provider_profiles`),
//! identical shape. The `UNIQUE(user_id)` constraint enforces the
//! at-most-one-profile-per-(role, user) invariant at the database level.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

use crate::routing::{ProfileLookup, Role};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking a page request indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// A persisted profile record. Shape is shared across both role tables.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: String,
    pub display_name: String,
    pub bio: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("marketd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        // Idempotent DDL, run on every startup.
        for table in ["client_profiles", "provider_profiles"] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE,
                    display_name TEXT NOT NULL,
                    bio TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )"
            ))
            .execute(pool)
            .await
            .with_context(|| format!("failed to create table {table}"))?;
        }
        Ok(())
    }

    // ─── Profiles ───────────────────────────────────────────────────────────

    /// Minimal existence probe for (role, user). Used by the "new" page flow.
    pub async fn profile_exists(&self, role: Role, user_id: &str) -> Result<bool> {
        with_timeout(async {
            let found: Option<i64> = sqlx::query_scalar(&format!(
                "SELECT 1 FROM {} WHERE user_id = ? LIMIT 1",
                role.table()
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(found.is_some())
        })
        .await
    }

    /// Full record fetch for (role, user). Used by the "edit" page flow.
    pub async fn fetch_profile(&self, role: Role, user_id: &str) -> Result<Option<ProfileRow>> {
        with_timeout(async {
            let row = sqlx::query_as::<_, ProfileRow>(&format!(
                "SELECT id, user_id, display_name, bio, created_at, updated_at
                 FROM {} WHERE user_id = ?",
                role.table()
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        })
        .await
    }

    /// Create or update the profile for (role, user).
    ///
    /// Called from the form submit path, never from the routing resolver.
    /// The upsert keeps `created_at` and the row id stable across edits.
    pub async fn upsert_profile(
        &self,
        role: Role,
        user_id: &str,
        display_name: &str,
        bio: &str,
    ) -> Result<ProfileRow> {
        let now = Utc::now().to_rfc3339();
        with_timeout(async {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, display_name, bio, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     bio = excluded.bio,
                     updated_at = excluded.updated_at",
                role.table()
            ))
            .bind(user_id)
            .bind(display_name)
            .bind(bio)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;

            self.fetch_profile_inner(role, user_id)
                .await?
                .context("profile row missing immediately after upsert")
        })
        .await
    }

    // Unguarded fetch used inside already-timed-out-guarded operations.
    async fn fetch_profile_inner(&self, role: Role, user_id: &str) -> Result<Option<ProfileRow>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT id, user_id, display_name, bio, created_at, updated_at
             FROM {} WHERE user_id = ?",
            role.table()
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ProfileLookup for Storage {
    async fn exists(&self, role: Role, user_id: &str) -> Result<bool> {
        self.profile_exists(role, user_id).await
    }

    async fn fetch(&self, role: Role, user_id: &str) -> Result<Option<ProfileRow>> {
        self.fetch_profile(role, user_id).await
    }
}
