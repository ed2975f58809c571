//! Storage-specific error type wrapping sqlx errors.

use thermotwin_domain::error::TwinError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for TwinError {
    fn from(err: StorageError) -> Self {
        Self::storage(err)
    }
}

/// Wrap a column decoding failure the way sqlx reports them.
pub(crate) fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_into_storage_twin_error() {
        let err: TwinError = StorageError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, TwinError::Storage(_)));
        assert!(!err.is_client_error());
    }
}
