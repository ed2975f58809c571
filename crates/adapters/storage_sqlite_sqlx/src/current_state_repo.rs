//! `SQLite` implementation of [`CurrentStateRepository`].

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use thermotwin_app::ports::CurrentStateRepository;
use thermotwin_domain::current_state::{CurrentState, OperatingState};
use thermotwin_domain::error::TwinError;
use thermotwin_domain::id::DeviceId;

use crate::error::{StorageError, decode_error};

/// Wrapper for converting database rows into domain [`CurrentState`].
struct Wrapper(CurrentState);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let timestamp: String = row.try_get("timestamp")?;
        let operating_state: String = row.try_get("operating_state")?;
        let current_temperature: f64 = row.try_get("current_temperature")?;
        let current_humidity: Option<f64> = row.try_get("current_humidity")?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(decode_error)?
            .with_timezone(&Utc);
        let operating_state = OperatingState::from_str(&operating_state).map_err(decode_error)?;

        Ok(Self(CurrentState {
            device_id: DeviceId::from(device_id),
            timestamp,
            operating_state,
            current_temperature,
            current_humidity,
        }))
    }
}

const SELECT_BY_DEVICE: &str = "SELECT * FROM current_state WHERE device_id = ?";
const UPSERT: &str = "INSERT INTO current_state \
     (device_id, timestamp, operating_state, current_temperature, current_humidity) \
     VALUES (?, ?, ?, ?, ?) \
     ON CONFLICT(device_id) DO UPDATE SET \
     timestamp = excluded.timestamp, \
     operating_state = excluded.operating_state, \
     current_temperature = excluded.current_temperature, \
     current_humidity = excluded.current_humidity";

/// `SQLite`-backed current state repository.
pub struct SqliteCurrentStateRepository {
    pool: SqlitePool,
}

impl SqliteCurrentStateRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CurrentStateRepository for SqliteCurrentStateRepository {
    fn get_current_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_DEVICE)
                .bind(device_id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn put_current_state(
        &self,
        state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        let pool = self.pool.clone();
        let state = state.clone();
        async move {
            sqlx::query(UPSERT)
                .bind(state.device_id.as_str())
                .bind(state.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
                .bind(state.operating_state.as_str())
                .bind(state.current_temperature)
                .bind(state.current_humidity)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::Duration;

    async fn setup() -> SqliteCurrentStateRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteCurrentStateRepository::new(db.pool().clone())
    }

    fn report(humidity: Option<f64>) -> CurrentState {
        CurrentState {
            device_id: DeviceId::from("d1"),
            timestamp: Utc::now(),
            operating_state: OperatingState::Cooling,
            current_temperature: 23.25,
            current_humidity: humidity,
        }
    }

    #[tokio::test]
    async fn should_return_none_before_first_report() {
        let repo = setup().await;
        let found = repo.get_current_state(&DeviceId::from("d1")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn should_store_and_read_back_exact_report() {
        let repo = setup().await;
        let state = report(Some(55.5));

        repo.put_current_state(&state).await.unwrap();

        let stored = repo
            .get_current_state(&state.device_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, state);
    }

    #[tokio::test]
    async fn should_store_report_without_humidity() {
        let repo = setup().await;
        let state = report(None);

        repo.put_current_state(&state).await.unwrap();

        let stored = repo
            .get_current_state(&state.device_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_humidity, None);
    }

    #[tokio::test]
    async fn should_overwrite_unconditionally() {
        let repo = setup().await;
        let newer = report(Some(40.0));
        let mut older = report(None);
        older.timestamp = newer.timestamp - Duration::minutes(1);
        older.operating_state = OperatingState::Idle;

        repo.put_current_state(&newer).await.unwrap();
        repo.put_current_state(&older).await.unwrap();

        let stored = repo
            .get_current_state(&older.device_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, older);
    }
}
