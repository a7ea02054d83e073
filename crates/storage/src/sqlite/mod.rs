use std::time::Duration;

use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::StorageError;

mod migrate;
mod runtime;

pub use runtime::SqliteRuntime;

/// SQLite-backed CMI data store: learners and their per-element values.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Insert or rename a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on query failure.
    pub async fn upsert_learner(&self, id: &str, name: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learners (id, name, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(id)
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    /// Display name of a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown learners.
    pub async fn learner_name(&self, id: &str) -> Result<String, StorageError> {
        let row = sqlx::query("SELECT name FROM learners WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?
            .ok_or(StorageError::NotFound)?;
        row.try_get("name")
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Stored value of one CMI element.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on query failure.
    pub async fn get_value(&self, learner_id: &str, element: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM cmi_values WHERE learner_id = ?1 AND element = ?2")
            .bind(learner_id)
            .bind(element)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        row.map(|row| row.try_get("value"))
            .transpose()
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Write a batch of element values atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the transaction fails; nothing is written then.
    pub async fn put_values(
        &self,
        learner_id: &str,
        values: &[(String, String)],
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        for (element, value) in values {
            sqlx::query(
                r"
                INSERT INTO cmi_values (learner_id, element, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(learner_id, element) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(learner_id)
            .bind(element)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
        assert_send_sync::<SqliteRuntime>();
    }
}
