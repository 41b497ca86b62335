use std::path::PathBuf;
use thiserror::Error;

/// Main error type for webpwatch
#[derive(Error, Debug)]
pub enum WebpwatchError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem watcher errors
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Image conversion errors
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Desktop notification errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Why a single WebP -> PNG conversion failed.
///
/// Variants follow the order of the conversion steps, so the first failing
/// step names the error.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webp decode failed for {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("png creation failed for {path}: {source}")]
    CreateOutputFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("png encode failed for {path}: {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Best-effort desktop notification failures. Never fatal.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no notification helper found on PATH")]
    Unavailable,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}

/// Convenient Result type using WebpwatchError
pub type Result<T> = std::result::Result<T, WebpwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebpwatchError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WebpwatchError = io_err.into();
        assert!(matches!(err, WebpwatchError::Io(_)));
    }

    #[test]
    fn test_convert_error_names_path() {
        let err = ConvertError::OpenFailed {
            path: PathBuf::from("/tmp/cat.webp"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/cat.webp"), "msg={}", msg);
        assert!(msg.contains("gone"));

        let wrapped: WebpwatchError = err.into();
        assert!(matches!(wrapped, WebpwatchError::Convert(ConvertError::OpenFailed { .. })));
    }

    #[test]
    fn test_notify_error_into_crate_error() {
        let err: WebpwatchError = NotifyError::Unavailable.into();
        assert!(err.to_string().contains("Notification error"));
    }
}
