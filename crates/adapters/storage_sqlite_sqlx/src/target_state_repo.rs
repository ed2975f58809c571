//! `SQLite` implementation of [`TargetStateRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use thermotwin_app::ports::TargetStateRepository;
use thermotwin_domain::error::TwinError;
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::{Mode, TargetStatePatch};

use crate::error::{StorageError, decode_error};

/// Wrapper for converting database rows into a domain [`TargetStatePatch`].
struct Wrapper(TargetStatePatch);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let mode: Option<String> = row.try_get("mode")?;
        let target_temperature: Option<i32> = row.try_get("target_temperature")?;

        let mode = mode
            .as_deref()
            .map(Mode::from_str)
            .transpose()
            .map_err(decode_error)?;

        Ok(Self(TargetStatePatch {
            mode,
            target_temperature,
        }))
    }
}

const SELECT_BY_DEVICE: &str =
    "SELECT mode, target_temperature FROM target_state WHERE device_id = ?";
const MERGE: &str = "INSERT INTO target_state (device_id, mode, target_temperature) \
     VALUES (?, ?, ?) \
     ON CONFLICT(device_id) DO UPDATE SET \
     mode = COALESCE(excluded.mode, target_state.mode), \
     target_temperature = COALESCE(excluded.target_temperature, target_state.target_temperature)";

/// `SQLite`-backed target state repository.
///
/// Merges are a single upsert statement, so absent fields are never
/// overwritten even without application-level locking.
pub struct SqliteTargetStateRepository {
    pool: SqlitePool,
}

impl SqliteTargetStateRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TargetStateRepository for SqliteTargetStateRepository {
    fn get_target_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<TargetStatePatch>, TwinError>> + Send {
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

    fn merge_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        async move {
            sqlx::query(MERGE)
                .bind(device_id)
                .bind(patch.mode.map(Mode::as_str))
                .bind(patch.target_temperature)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
