use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::{
    Row, SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use wattson_core::{Device, DeviceId, DeviceKind, DevicePatch, PowerStatus, RawTimestamp, Watts};

use super::{DeviceStore, NewDevice, StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, thiserror::Error)]
pub enum SqliteStoreError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Devices persisted in a single SQLite table. Timestamps are kept as text
/// exactly as written, so offset-less values written by other tools are
/// still interpreted in the board's time zone.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> Result<Self, SqliteStoreError> {
        // every connection to `:memory:` opens its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Inserts fully-formed documents, e.g. a seed file, keeping their ids.
    pub async fn import(&self, devices: &[Device]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for device in devices {
            let result = sqlx::query(
                r#"
                INSERT INTO devices (id, name, kind, current_power, power_status, last_updated, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(device.id.as_str())
            .bind(&*device.name)
            .bind(device.kind.as_str())
            .bind(device.current_power.map(Watts::get))
            .bind(device.power_status.as_str())
            .bind(timestamp_text(&device.id, &device.last_updated)?)
            .bind(timestamp_text(&device.id, &device.created_at)?)
            .execute(&mut *tx)
            .await;

            if let Err(e) = result {
                return Err(insert_error(&device.id, e));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for SqliteStore {
    async fn fetch_all(&self) -> Result<Vec<Device>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, kind, current_power, power_status, last_updated, created_at
            FROM devices ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_device).collect()
    }

    async fn patch(&self, id: &DeviceId, patch: DevicePatch) -> Result<(), StoreError> {
        let result = sqlx::query(r#"UPDATE devices SET power_status = ?, last_updated = ? WHERE id = ?"#)
            .bind(patch.power_status.as_str())
            .bind(timestamp_text(id, &patch.last_updated)?)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn insert(&self, device: NewDevice) -> Result<Device, StoreError> {
        let device = device.into_device();
        self.import(std::slice::from_ref(&device)).await?;
        Ok(device)
    }

    async fn remove(&self, id: &DeviceId) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM devices WHERE id = ?"#)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

fn insert_error(id: &DeviceId, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(id.clone()),
        _ => StoreError::from(e),
    }
}

fn timestamp_text(id: &DeviceId, raw: &RawTimestamp) -> Result<String, StoreError> {
    match raw {
        RawTimestamp::Text(text) => Ok(text.clone()),
        RawTimestamp::Instant(ts) => Ok(ts.to_string()),
        RawTimestamp::Native {
            seconds,
            nanoseconds,
        } => Timestamp::new(*seconds, *nanoseconds)
            .map(|ts| ts.to_string())
            .map_err(|e| StoreError::Corrupt {
                id: id.clone(),
                reason: e.to_string(),
            }),
    }
}

fn row_to_device(row: &SqliteRow) -> Result<Device, StoreError> {
    let id = DeviceId::from(row.try_get::<String, _>("id")?);

    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    let power_status = row
        .try_get::<String, _>("power_status")?
        .parse::<PowerStatus>()
        .map_err(|e| corrupt(e.to_string()))?;

    let current_power = row
        .try_get::<Option<f64>, _>("current_power")?
        .map(Watts::new)
        .transpose()
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(Device {
        name: row.try_get::<String, _>("name")?.into_boxed_str(),
        kind: DeviceKind::from(row.try_get::<String, _>("kind")?),
        current_power,
        power_status,
        last_updated: RawTimestamp::Text(row.try_get("last_updated")?),
        created_at: RawTimestamp::Text(row.try_get("created_at")?),
        id,
    })
}
