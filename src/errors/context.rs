//! Error context helpers
//!
//! Wraps foreign errors into [`AppError`] while recording what the crate was
//! doing at the time, keeping the typed error.

use std::path::PathBuf;

use super::types::AppError;

/// Extension trait for adding context to `Result`s carrying foreign errors
pub trait ErrorContextExt<T> {
    /// Record a failed file operation as an [`AppError::Io`]
    fn in_file_operation(self, path: impl Into<PathBuf>, operation: impl Into<String>) -> Result<T, AppError>;
}

impl<T, E> ErrorContextExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn in_file_operation(self, path: impl Into<PathBuf>, operation: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::io_with_source(path, operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_operation_builds_io_error() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"));
        let err = result.in_file_operation("/tmp/x.json", "write snapshot").unwrap_err();

        match err {
            AppError::Io { path, operation, .. } => {
                assert_eq!(path, PathBuf::from("/tmp/x.json"));
                assert_eq!(operation, "write snapshot");
            }
            other => panic!("expected Io error, got {:?}", other),
        }
        assert_eq!(
            AppError::io_with_source("/tmp/x.json", "write snapshot", std::io::Error::other("nope")).to_string(),
            "File I/O error for '/tmp/x.json': write snapshot"
        );
    }
}
