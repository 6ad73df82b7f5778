use std::{fmt, io, path::PathBuf};

use crate::store::StoreError;

pub(crate) enum Error {
    DatabaseCloseFailed(StoreError),
    DatabaseOpenFailed(PathBuf, StoreError),
    ImportFileInvalid(PathBuf, io::Error),
    ImportFileUnreadable(PathBuf, io::Error),
    ImportRejected(StoreError),
    ListenFailed(String, io::Error),
    NoDataDirectory,
    OutputFailed(serde_json::Error),
    QueryFailed(StoreError),
    ShutdownSignalFailed(io::Error),
}

// Rust only supports `fn main() -> Result<(), E: Debug>`, so we implement `Debug`
// manually to provide the error output we want.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DatabaseCloseFailed(e) => write!(f, "Failed to close the document store: {e}"),
            Error::DatabaseOpenFailed(path, e) => {
                write!(f, "Failed to open the document store at {}: {e}", path.display())
            }
            Error::ImportFileInvalid(path, e) => {
                write!(f, "{} is not valid JSON Lines: {e}", path.display())
            }
            Error::ImportFileUnreadable(path, e) => {
                write!(f, "Failed to read {}: {e}", path.display())
            }
            Error::ImportRejected(e) => write!(f, "Import failed: {e}"),
            Error::ListenFailed(addr, e) => write!(f, "Failed to listen on {addr}: {e}"),
            Error::NoDataDirectory => write!(
                f,
                "Could not determine a data directory; pass --db to choose a store"
            ),
            Error::OutputFailed(e) => write!(f, "Failed to write the response: {e}"),
            Error::QueryFailed(e) => write!(f, "Range query failed: {e}"),
            Error::ShutdownSignalFailed(e) => {
                write!(f, "Failed to listen for the shutdown signal: {e}")
            }
        }
    }
}
