//! MySQL backend for the binding store.
//!
//! The `players` table carries the constraints the validator relies on:
//! `identity_key` is the primary key and `name` has a unique index, so a
//! second conflicting write fails inside the database instead of
//! silently succeeding. Duplicate-key errors come back as
//! [`StoreError::Violation`]; everything else is
//! [`StoreError::Unavailable`].
//!
//! The `name` column is pinned to `utf8mb4_0900_as_ci` (MySQL 8): case
//! insensitive but accent sensitive, like [`fold_name`](crate::fold_name).
//! A table created by an older build keeps whatever collation it got.
//!
//! Each upsert runs at READ COMMITTED so a first-time claim takes no gap
//! lock. A deadlock or lock-wait timeout still means the write lost to a
//! concurrent one, and is reported as [`StoreError::Violation`].

use sqlx::mysql::{
    MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlPool,
    MySqlPoolOptions, MySqlRow,
};
use sqlx::{Connection, Row};

use crate::{Binding, BindingStore, IdentityKey, StoreConfig, StoreError};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS players (
        identity_key       VARCHAR(36) NOT NULL PRIMARY KEY,
        name               VARCHAR(16) CHARACTER SET utf8mb4
                           COLLATE utf8mb4_0900_as_ci NOT NULL,
        first_seen_address VARCHAR(45) NULL,
        last_seen_address  VARCHAR(45) NULL,
        UNIQUE KEY players_name_unique (name)
    )
"#;

const SELECT_BY_NAME: &str = "SELECT identity_key, name, first_seen_address, last_seen_address \
     FROM players WHERE name = ?";

const READ_COMMITTED: &str = "SET TRANSACTION ISOLATION LEVEL READ COMMITTED";

const LOCK_BY_KEY: &str = "SELECT identity_key FROM players WHERE identity_key = ? FOR UPDATE";

const UPDATE_BINDING: &str = "UPDATE players \
     SET name = ?, last_seen_address = COALESCE(?, last_seen_address) \
     WHERE identity_key = ?";

const INSERT_BINDING: &str = "INSERT INTO players \
     (identity_key, name, first_seen_address, last_seen_address) \
     VALUES (?, ?, ?, ?)";

const TOUCH_LAST_SEEN: &str = "UPDATE players SET last_seen_address = ? WHERE identity_key = ?";

/// `ER_LOCK_WAIT_TIMEOUT`
const LOCK_WAIT_TIMEOUT: u16 = 1205;
/// `ER_LOCK_DEADLOCK`
const LOCK_DEADLOCK: u16 = 1213;

/// A binding store backed by a pooled MySQL connection.
///
/// Cloning is cheap: clones share the pool.
#[derive(Clone)]
pub struct MySqlBindingStore {
    pool: MySqlPool,
}

impl MySqlBindingStore {
    /// Creates the database and `players` table if absent, then connects.
    ///
    /// Idempotent. Run once at startup, before the first login is
    /// evaluated.
    pub async fn provision(config: &StoreConfig) -> Result<Self, StoreError> {
        let database = quote_identifier(&config.database)?;

        let mut conn = MySqlConnection::connect_with(&server_options(config))
            .await
            .map_err(|e| unavailable("failed to connect to mysql", e))?;
        sqlx::query(&format!("CREATE DATABASE IF NOT EXISTS {database}"))
            .execute(&mut conn)
            .await
            .map_err(|e| unavailable("failed to create database", e))?;
        conn.close()
            .await
            .map_err(|e| unavailable("failed to close bootstrap connection", e))?;

        let store = Self::connect(config).await?;
        store.create_schema().await?;
        tracing::info!(
            host = %config.host,
            database = %config.database,
            "binding store provisioned"
        );
        Ok(store)
    }

    /// Connects a pool to an already provisioned database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = server_options(config).database(&config.database);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| unavailable("failed to connect to mysql", e))?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool. The schema is assumed to exist.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates the `players` table if it doesn't exist.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("schema init failed", e))?;
        Ok(())
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Closes every pooled connection. Further operations fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl BindingStore for MySqlBindingStore {
    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        let row = sqlx::query(SELECT_BY_NAME)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| row_to_binding(&row)).transpose()
    }

    async fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        // Applies to the next transaction on this connection only.
        sqlx::query(READ_COMMITTED)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = conn.begin().await.map_err(map_sqlx_error)?;

        let existing = sqlx::query(LOCK_BY_KEY)
            .bind(identity_key.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if existing.is_some() {
            sqlx::query(UPDATE_BINDING)
                .bind(name)
                .bind(origin_address)
                .bind(identity_key.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        } else {
            sqlx::query(INSERT_BINDING)
                .bind(identity_key.as_str())
                .bind(name)
                .bind(origin_address)
                .bind(origin_address)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(TOUCH_LAST_SEEN)
            .bind(origin_address)
            .bind(identity_key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn server_options(config: &StoreConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
}

fn row_to_binding(row: &MySqlRow) -> Result<Binding, StoreError> {
    let decode = |e: sqlx::Error| unavailable("undecodable players row", e);
    let identity_key: String = row.try_get("identity_key").map_err(decode)?;
    Ok(Binding {
        identity_key: IdentityKey::new(&identity_key),
        name: row.try_get("name").map_err(decode)?,
        first_seen_address: row.try_get("first_seen_address").map_err(decode)?,
        last_seen_address: row.try_get("last_seen_address").map_err(decode)?,
    })
}

/// Database names can't be bound as parameters, so they are checked and
/// backtick-quoted instead.
fn quote_identifier(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if !valid {
        return Err(StoreError::Unavailable(format!(
            "invalid database name `{name}`"
        )));
    }
    Ok(format!("`{name}`"))
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Violation(db_err.message().to_string());
        }
        let lost = db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|mysql_err| is_lost_race(mysql_err.number()));
        if lost {
            return StoreError::Violation(format!(
                "lost to a concurrent write: {}",
                db_err.message()
            ));
        }
    }
    StoreError::Unavailable(err.to_string())
}

/// Lock errors raised when two writers contend for the same rows.
fn is_lost_race(error_number: u16) -> bool {
    matches!(error_number, LOCK_DEADLOCK | LOCK_WAIT_TIMEOUT)
}

fn unavailable(context: &str, err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("{context}: {err}"))
}
