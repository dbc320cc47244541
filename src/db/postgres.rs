//! PostgreSQL-backed `RecordStore` implementation

use crate::{
    config::DatabaseConfig,
    db::{RecordStore, RecordTransaction},
    models::{FieldValue, Record},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use std::{collections::BTreeMap, time::Duration};
use uuid::Uuid;

/// PostgreSQL-backed RecordStore implementation
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(Error::Database)?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("failed to run migrations: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Register a subject identity. Identity management proper lives
    /// outside this crate; this exists for bootstrap and test fixtures.
    pub async fn register_subject(&self, subject_id: Uuid, email: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO subjects (id, email)
             VALUES ($1, $2)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(subject_id)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

/// Wraps one sqlx transaction. Dropping it without a commit rolls the
/// database transaction back.
pub struct PgRecordTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgRecordTransaction {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Internal("transaction already finished".to_string()))
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    type Tx = PgRecordTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await.map_err(Error::Database)?;
        Ok(PgRecordTransaction { tx: Some(tx) })
    }
}

#[async_trait]
impl RecordTransaction for PgRecordTransaction {
    async fn subject_exists(&mut self, subject_id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let row = sqlx::query("SELECT 1 FROM subjects WHERE id = $1")
            .bind(subject_id)
            .fetch_optional(&mut **conn)
            .await
            .map_err(Error::Database)?;
        Ok(row.is_some())
    }

    async fn load_record(&mut self, subject_id: Uuid, category: &str) -> Result<Option<Record>> {
        // Plain read, deliberately without a row lock: concurrent writers
        // for the same (subject, category) pair keep last-write-wins
        // semantics, and the per-field version tag is not a CAS token.
        let conn = self.conn()?;
        let row = sqlx::query(
            "SELECT fields, updated_at FROM history_records
             WHERE subject_id = $1 AND category = $2",
        )
        .bind(subject_id)
        .bind(category)
        .fetch_optional(&mut **conn)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fields: JsonValue = row.get("fields");
        let fields: BTreeMap<String, FieldValue> = serde_json::from_value(fields).map_err(|e| {
            Error::Internal(format!(
                "corrupt history record for subject {subject_id}, category '{category}': {e}"
            ))
        })?;

        Ok(Some(Record {
            subject_id,
            category: category.to_string(),
            fields,
            updated_at: row.get("updated_at"),
        }))
    }

    async fn write_record(
        &mut self,
        subject_id: Uuid,
        category: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record> {
        let now = Utc::now();
        let payload = serde_json::to_value(&fields)
            .map_err(|e| Error::Internal(format!("failed to serialize record fields: {e}")))?;

        let conn = self.conn()?;
        sqlx::query(
            "INSERT INTO history_records (subject_id, category, fields, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (subject_id, category)
             DO UPDATE SET fields = EXCLUDED.fields, updated_at = EXCLUDED.updated_at",
        )
        .bind(subject_id)
        .bind(category)
        .bind(&payload)
        .bind(now)
        .execute(&mut **conn)
        .await
        .map_err(Error::Database)?;

        Ok(Record {
            subject_id,
            category: category.to_string(),
            fields,
            updated_at: now,
        })
    }

    async fn commit(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(Error::Database),
            None => Err(Error::Internal("transaction already finished".to_string())),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(Error::Database),
            None => Err(Error::Internal("transaction already finished".to_string())),
        }
    }
}
