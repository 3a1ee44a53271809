/// Error types for reader-content conversion
use std::io;

/// Result type alias for reader-content operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while preparing reader content
///
/// The parsing pipeline itself never surfaces these to callers: an
/// unparseable document is reported as an empty content-unit list, and
/// per-element failures (missing entries, undecodable bytes) resolve to
/// silent drops. These errors belong to the surrounding resource
/// handling, i.e. opening the book archive in the first place.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// ZIP archive access error
    #[error("Failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
