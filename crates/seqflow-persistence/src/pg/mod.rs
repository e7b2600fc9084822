//! `PgStepStore`: snapshots de sesión en Postgres (Diesel).
//!
//! - Una fila por sesión en `workflow_sessions`; el snapshot completo va en
//!   `snapshot` (JSONB). Cada write es un upsert sobre `session_id`.
//! - La lectura filtra también por `workflow_kind`: una sesión de otro tipo
//!   se ve como inexistente.
//! - Errores transitorios (conflicto de serialización, pool) se reintentan
//!   con un backoff corto.
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::upsert::excluded;
use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use seqflow_core::store::decode_snapshot_value;
use seqflow_core::{Fact, SessionId, SessionSnapshot, StepStore, StoreError};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::workflow_sessions;

/// Pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real o doble de test).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workflow_sessions)]
struct NewSessionRow<'a> {
    session_id: Uuid,
    workflow_kind: &'a str,
    created_at: DateTime<Utc>,
    snapshot: Value,
    updated_at: DateTime<Utc>,
}

fn is_retryable(e: &PersistenceError) -> bool {
    matches!(e, PersistenceError::SerializationConflict | PersistenceError::TransientIo(_))
}

/// Hasta 3 reintentos con backoff de 15ms, 30ms, 45ms.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("pg_store: retryable error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

pub struct PgStepStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgStepStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<F: Fact, P: ConnectionProvider> StepStore<F> for PgStepStore<P> {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        let row: Option<Value> = with_retry(|| {
                                     let mut conn = self.provider.connection()?;
                                     workflow_sessions::table.filter(workflow_sessions::session_id.eq(id.as_uuid()))
                                                             .filter(workflow_sessions::workflow_kind.eq(workflow_kind))
                                                             .select(workflow_sessions::snapshot)
                                                             .first::<Value>(&mut conn)
                                                             .optional()
                                                             .map_err(PersistenceError::from)
                                 })?;
        row.map(decode_snapshot_value).transpose()
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        let value = serde_json::to_value(snapshot).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let row = NewSessionRow { session_id: id.as_uuid(),
                                  workflow_kind: &snapshot.header.workflow_kind,
                                  created_at: snapshot.header.created_at,
                                  snapshot: value,
                                  updated_at: Utc::now() };
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(workflow_sessions::table).values(&row)
                                                         .on_conflict(workflow_sessions::session_id)
                                                         .do_update()
                                                         .set((workflow_sessions::workflow_kind.eq(excluded(workflow_sessions::workflow_kind)),
                                                               workflow_sessions::snapshot.eq(excluded(workflow_sessions::snapshot)),
                                                               workflow_sessions::updated_at.eq(excluded(workflow_sessions::updated_at))))
                                                         .execute(&mut conn)
                                                         .map_err(PersistenceError::from)
        })?;
        debug!("pg_store:write:done session={id} steps={}", snapshot.steps.len());
        Ok(())
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        let n = with_retry(|| {
                    let mut conn = self.provider.connection()?;
                    diesel::delete(workflow_sessions::table.filter(workflow_sessions::session_id.eq(id.as_uuid()))
                                                           .filter(workflow_sessions::workflow_kind.eq(workflow_kind)))
                    .execute(&mut conn)
                    .map_err(PersistenceError::from)
                })?;
        Ok(n > 0)
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        let ids: Vec<Uuid> = with_retry(|| {
                                 let mut conn = self.provider.connection()?;
                                 workflow_sessions::table.filter(workflow_sessions::workflow_kind.eq(workflow_kind))
                                                         .order(workflow_sessions::created_at.asc())
                                                         .select(workflow_sessions::session_id)
                                                         .load::<Uuid>(&mut conn)
                                                         .map_err(PersistenceError::from)
                             })?;
        Ok(ids.into_iter().map(SessionId::from).collect())
    }
}

/// Construye el pool y corre las migraciones pendientes una vez.
///
/// Si `min_size > max_size` se usa `min_size = max_size`; tamaños 0 se
/// llevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1);
    if min > max {
        warn!("pg_store: min_size > max_size ({min} > {max}), using min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min.min(max)))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

pub fn build_pool_from_config(cfg: &DbConfig) -> Result<PgPool, PersistenceError> {
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
