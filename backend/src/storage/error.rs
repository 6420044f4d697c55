use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::traits::Collection;

/// Failures raised by the durable store itself.
///
/// These travel inside `anyhow::Error`; callers that need to react to a
/// specific case can `downcast_ref::<StorageError>()`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write did not reach durable storage. Nothing was changed.
    #[error("Failed to persist {collection} to {path}: {source}")]
    WriteFailure {
        collection: Collection,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Collection {collection} has not been loaded yet")]
    NotLoaded { collection: Collection },
}
