//! SQLite-backed obslog store.

use super::{MetadataStore, StoreError};
use crate::data::{Field, FieldType, FrameRecord, Value, DATE_FORMAT};
use crate::query::Query;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::PathBuf;
use tokio::runtime::Runtime as TokioRuntime;
use tracing::{debug, info};

/// Configuration for the SQLite obslog store.
#[derive(Clone, Debug)]
pub struct SqliteConfig {
    /// Path of the obslog database file.
    pub path: PathBuf,
    /// Table holding one row per raw frame.
    pub table: String,
    /// Column carrying the frame identifier.
    pub id_column: String,
    /// Worker threads of the private async runtime.
    pub worker_count: usize,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./raw/obsLog.sqlite3"),
            table: "obslog".to_string(),
            id_column: "File".to_string(),
            worker_count: num_cpus::get(),
            max_connections: 4,
        }
    }
}

impl SqliteConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Read-only obslog store.
///
/// Owns its own Tokio runtime so callers stay synchronous.
pub struct SqliteStore {
    config: SqliteConfig,
    pool: SqlitePool,
    runtime: TokioRuntime,
}

impl SqliteStore {
    /// Open the database read-only. A missing file is `Unavailable`.
    pub fn open(config: SqliteConfig) -> Result<Self, StoreError> {
        let location = config.path.display().to_string();
        let unavailable = |reason: String| StoreError::Unavailable {
            location: location.clone(),
            reason,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_count.max(1))
            .enable_all()
            .build()
            .map_err(|e| unavailable(format!("failed to start async runtime: {}", e)))?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .read_only(true)
            .create_if_missing(false);

        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections.max(1))
                    .connect_with(options),
            )
            .map_err(|e| unavailable(e.to_string()))?;

        info!(path = %location, table = %config.table, "opened obslog database");

        Ok(Self {
            config,
            pool,
            runtime,
        })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn decode(&self, row: &SqliteRow) -> Result<FrameRecord, StoreError> {
        let id: String = row
            .try_get("frame_id")
            .map_err(|e| StoreError::MissingIdentifier(e.to_string()))?;

        let mut record = FrameRecord::new(id);
        for field in Field::ALL {
            if let Some(value) = decode_field(row, field) {
                record.set(field, value);
            }
        }
        Ok(record)
    }
}

fn decode_field(row: &SqliteRow, field: Field) -> Option<Value> {
    let column = field.column();
    match field.field_type() {
        FieldType::Text => row
            .try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .map(Value::Text),
        FieldType::Real => decode_real(row, column).map(Value::Real),
        FieldType::Flag => row
            .try_get::<Option<i64>, _>(column)
            .ok()
            .flatten()
            .map(|v| Value::Flag(v != 0)),
        FieldType::Date => row
            .try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .and_then(|raw| {
                // Accept full timestamps by keeping the date part.
                let date = raw.get(..10).unwrap_or(&raw);
                NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
            })
            .map(Value::Date),
    }
}

fn decode_real(row: &SqliteRow, column: &str) -> Option<f64> {
    match row.try_get::<Option<f64>, _>(column) {
        Ok(value) => value,
        Err(_) => row
            .try_get::<Option<i64>, _>(column)
            .ok()
            .flatten()
            .map(|v| v as f64),
    }
}

impl MetadataStore for SqliteStore {
    fn query(&self, query: &Query) -> Result<Vec<FrameRecord>, StoreError> {
        let statement = query.to_sql(&self.config.table, &self.config.id_column);
        debug!(sql = %statement.sql, params = statement.params.len(), "executing obslog query");

        let rows = self
            .runtime
            .block_on(async {
                let mut sql = sqlx::query(&statement.sql);
                for param in &statement.params {
                    sql = match param {
                        Value::Text(s) => sql.bind(s.clone()),
                        Value::Real(r) => sql.bind(*r),
                        Value::Flag(b) => sql.bind(i64::from(*b)),
                        Value::Date(d) => sql.bind(d.format(DATE_FORMAT).to_string()),
                    };
                }
                sql.fetch_all(&self.pool).await
            })
            .map_err(|e| match e {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                    StoreError::Unavailable {
                        location: self.config.path.display().to_string(),
                        reason: e.to_string(),
                    }
                }
                other => StoreError::QueryFailed(other.to_string()),
            })?;

        rows.iter().map(|row| self.decode(row)).collect()
    }
}
