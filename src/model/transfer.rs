use std::time::SystemTime;

/// Metadata for a single remote object, as reported by the storage service.
#[derive(Clone, Debug)]
pub struct RemoteObject {
    pub key: String,
    pub size: i64,
    pub modified_time: SystemTime,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("resource does not exist in the repository: {0}")]
    ResourceNotFound(String),

    #[error("storage client error: {0}")]
    Storage(String),

    #[error("local i/o failure at: {path}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport is not connected")]
    NotConnected,
}

impl TransportError {
    pub fn local_io(path: &std::path::Path, source: std::io::Error) -> Self {
        TransportError::LocalIo {
            path: path.display().to_string(),
            source,
        }
    }
}
