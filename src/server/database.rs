use chrono::{NaiveDateTime, Utc};
use sqlx::{query, query_as, FromRow};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::errors::{ServiceError, ServiceResult};

/// A license record stored in the database.
///
/// Mirrors the `licenses` table. `hwid` is NULL until the first successful
/// `/verify` call binds the key; `active = false` soft-disables a key without
/// deleting it.
#[derive(Debug, Clone, FromRow)]
pub struct License {
    pub key: String,
    pub hwid: Option<String>,
    pub nickname: Option<String>,
    pub active: bool,
}

impl License {
    /// Whether this key has been bound to a hardware identifier.
    pub fn is_bound(&self) -> bool {
        self.hwid.is_some()
    }
}

/// A staff moderation statistics row, keyed logically on `(staff, date)`.
#[derive(Debug, Clone, FromRow)]
pub struct StaffStats {
    pub id: String,
    pub staff: String,
    pub date: String,
    pub bans: i64,
    pub mutes: i64,
    pub total: i64,
    pub updated_at: NaiveDateTime,
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Open a connection pool for the configured backend.
    ///
    /// The handle is constructed once by the entry point and injected into the
    /// handlers through `AppState`; nothing else in the crate opens pools.
    pub async fn connect(db_config: &DatabaseConfig) -> ServiceResult<Arc<Self>> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(&db_config.url).await.map_err(|e| {
                    error!("Failed to connect to SQLite: {e}");
                    ServiceError::DatabaseError(format!("failed to connect to SQLite: {e}"))
                })?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(ServiceError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(&db_config.url).await.map_err(|e| {
                    error!("Failed to connect to PostgreSQL: {e}");
                    ServiceError::DatabaseError(format!("failed to connect to PostgreSQL: {e}"))
                })?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(ServiceError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(ServiceError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Create the schema if it does not exist yet.
    ///
    /// Run once at startup, before the server accepts requests.
    pub async fn migrate(&self) -> ServiceResult<()> {
        let statements: &[&str] = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => &[
                r#"
                CREATE TABLE IF NOT EXISTS licenses (
                    key       TEXT PRIMARY KEY,
                    hwid      TEXT,
                    nickname  TEXT,
                    active    BOOLEAN NOT NULL DEFAULT 1
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS staff_stats (
                    id         TEXT PRIMARY KEY,
                    staff      TEXT NOT NULL,
                    date       TEXT NOT NULL,
                    bans       INTEGER NOT NULL DEFAULT 0,
                    mutes      INTEGER NOT NULL DEFAULT 0,
                    total      INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_staff_stats_staff ON staff_stats(staff)",
                "CREATE INDEX IF NOT EXISTS idx_staff_stats_date ON staff_stats(date)",
            ],
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => &[
                r#"
                CREATE TABLE IF NOT EXISTS licenses (
                    key       TEXT PRIMARY KEY,
                    hwid      TEXT,
                    nickname  TEXT,
                    active    BOOLEAN NOT NULL DEFAULT TRUE
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS staff_stats (
                    id         TEXT PRIMARY KEY,
                    staff      TEXT NOT NULL,
                    date       TEXT NOT NULL,
                    bans       BIGINT NOT NULL DEFAULT 0,
                    mutes      BIGINT NOT NULL DEFAULT 0,
                    total      BIGINT NOT NULL DEFAULT 0,
                    updated_at TIMESTAMP NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_staff_stats_staff ON staff_stats(staff)",
                "CREATE INDEX IF NOT EXISTS idx_staff_stats_date ON staff_stats(date)",
            ],
        };

        for sql in statements {
            self.execute_raw(sql).await?;
        }

        Ok(())
    }

    async fn execute_raw(&self, sql: &str) -> ServiceResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(sql).execute(pool).await.map_err(|e| {
                    error!("SQLite migration failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(sql).execute(pool).await.map_err(|e| {
                    error!("Postgres migration failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Licenses
    // ========================================================================

    /// Insert a freshly issued license: unbound, no nickname, active.
    ///
    /// Plain INSERT on purpose. Keys come out of a 36^15 space, so issuance
    /// does not check for collisions first; a duplicate would surface as a
    /// primary-key violation.
    pub async fn insert_license(&self, key: &str) -> ServiceResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query("INSERT INTO licenses (key, hwid, nickname, active) VALUES (?, NULL, NULL, 1)")
                    .bind(key)
                    .execute(pool)
                    .await
                    .map_err(|e| {
                        error!("SQLite insert_license failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("INSERT INTO licenses (key, hwid, nickname, active) VALUES ($1, NULL, NULL, TRUE)")
                    .bind(key)
                    .execute(pool)
                    .await
                    .map_err(|e| {
                        error!("Postgres insert_license failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;
            }
        }

        Ok(())
    }

    /// Fetch a license by its key.
    ///
    /// Returns:
    /// - `Ok(Some(License))` if found
    /// - `Ok(None)` if not found
    /// - `Err(ServiceError::DatabaseError)` on DB failure
    pub async fn get_license(&self, key: &str) -> ServiceResult<Option<License>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let license = query_as::<_, License>("SELECT * FROM licenses WHERE key = ?")
                    .bind(key)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        error!("SQLite get_license failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;

                Ok(license)
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let license = query_as::<_, License>("SELECT * FROM licenses WHERE key = $1")
                    .bind(key)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        error!("Postgres get_license failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;

                Ok(license)
            }
        }
    }

    /// Bind a still-unbound license to a hardware identifier.
    ///
    /// The update is conditional on `hwid IS NULL`, so of two concurrent
    /// binders exactly one commits; the loser sees `Ok(false)` and must
    /// re-read the row to find out who won. The hwid column is never
    /// overwritten once set.
    ///
    /// Returns:
    /// - `Ok(true)` if this call performed the bind
    /// - `Ok(false)` if the key was already bound (or does not exist)
    pub async fn bind_license(
        &self,
        key: &str,
        hwid: &str,
        nickname: Option<&str>,
    ) -> ServiceResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE licenses \
                     SET hwid = ?, nickname = ? \
                     WHERE key = ? AND hwid IS NULL",
            )
            .bind(hwid)
            .bind(nickname)
            .bind(key)
            .execute(pool)
            .await
            .map_err(|e| {
                error!("SQLite bind_license failed: {e}");
                ServiceError::DatabaseError(format!("database error: {e}"))
            })?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE licenses \
                     SET hwid = $1, nickname = $2 \
                     WHERE key = $3 AND hwid IS NULL",
            )
            .bind(hwid)
            .bind(nickname)
            .bind(key)
            .execute(pool)
            .await
            .map_err(|e| {
                error!("Postgres bind_license failed: {e}");
                ServiceError::DatabaseError(format!("database error: {e}"))
            })?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Delete a license unconditionally.
    ///
    /// Returns:
    /// - `Ok(true)` if a row was deleted
    /// - `Ok(false)` if no license with that key existed
    pub async fn delete_license(&self, key: &str) -> ServiceResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("DELETE FROM licenses WHERE key = ?")
                .bind(key)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("SQLite delete_license failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?
                .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("DELETE FROM licenses WHERE key = $1")
                .bind(key)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("Postgres delete_license failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?
                .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Fetch every license record. No ordering guarantee.
    pub async fn list_licenses(&self) -> ServiceResult<Vec<License>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let licenses = query_as::<_, License>("SELECT * FROM licenses")
                    .fetch_all(pool)
                    .await
                    .map_err(|e| {
                        error!("SQLite list_licenses failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;

                Ok(licenses)
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let licenses = query_as::<_, License>("SELECT * FROM licenses")
                    .fetch_all(pool)
                    .await
                    .map_err(|e| {
                        error!("Postgres list_licenses failed: {e}");
                        ServiceError::DatabaseError(format!("database error: {e}"))
                    })?;

                Ok(licenses)
            }
        }
    }

    // ========================================================================
    // Staff stats
    // ========================================================================

    /// Fetch the stats row for a staff member on a given date.
    pub async fn get_staff_stats(
        &self,
        staff: &str,
        date: &str,
    ) -> ServiceResult<Option<StaffStats>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let stats = query_as::<_, StaffStats>(
                    "SELECT * FROM staff_stats WHERE staff = ? AND date = ?",
                )
                .bind(staff)
                .bind(date)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    error!("SQLite get_staff_stats failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;

                Ok(stats)
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let stats = query_as::<_, StaffStats>(
                    "SELECT * FROM staff_stats WHERE staff = $1 AND date = $2",
                )
                .bind(staff)
                .bind(date)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    error!("Postgres get_staff_stats failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;

                Ok(stats)
            }
        }
    }

    /// Write the stats row for `(staff, date)`, replacing counts wholesale if
    /// one already exists.
    pub async fn upsert_staff_stats(
        &self,
        staff: &str,
        date: &str,
        bans: i64,
        mutes: i64,
        total: i64,
    ) -> ServiceResult<()> {
        let now = Utc::now().naive_utc();
        let existing = self.get_staff_stats(staff, date).await?;

        match (self, existing) {
            #[cfg(feature = "sqlite")]
            (Database::SQLite(pool), Some(row)) => {
                query(
                    "UPDATE staff_stats \
                         SET bans = ?, mutes = ?, total = ?, updated_at = ? \
                         WHERE id = ?",
                )
                .bind(bans)
                .bind(mutes)
                .bind(total)
                .bind(now)
                .bind(&row.id)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("SQLite upsert_staff_stats update failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "sqlite")]
            (Database::SQLite(pool), None) => {
                query(
                    "INSERT INTO staff_stats (id, staff, date, bans, mutes, total, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().simple().to_string())
                .bind(staff)
                .bind(date)
                .bind(bans)
                .bind(mutes)
                .bind(total)
                .bind(now)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("SQLite upsert_staff_stats insert failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            (Database::Postgres(pool), Some(row)) => {
                query(
                    "UPDATE staff_stats \
                         SET bans = $1, mutes = $2, total = $3, updated_at = $4 \
                         WHERE id = $5",
                )
                .bind(bans)
                .bind(mutes)
                .bind(total)
                .bind(now)
                .bind(&row.id)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("Postgres upsert_staff_stats update failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            (Database::Postgres(pool), None) => {
                query(
                    "INSERT INTO staff_stats (id, staff, date, bans, mutes, total, updated_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(Uuid::new_v4().simple().to_string())
                .bind(staff)
                .bind(date)
                .bind(bans)
                .bind(mutes)
                .bind(total)
                .bind(now)
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("Postgres upsert_staff_stats insert failed: {e}");
                    ServiceError::DatabaseError(format!("database error: {e}"))
                })?;
            }
        }

        Ok(())
    }
}
