use std::path::Path;

use crate::model;

/// Descriptor for a remote artifact repository. URLs take the form
/// `s3://bucket-name/optional/base/path`; the host component names the
/// bucket and the path component becomes the key prefix.
#[derive(Clone, Debug)]
pub struct Repository {
    pub host: String,
    pub basedir: String,
}

impl Repository {
    pub fn parse(url: &str) -> Result<Self, model::transfer::TransportError> {
        let rest = match url.split_once("://") {
            Some(("s3", rest)) => rest,
            _ => {
                return Err(model::transfer::TransportError::Storage(format!(
                    "unsupported repository url: {}",
                    url
                )));
            }
        };

        let (host, basedir) = match rest.split_once('/') {
            Some((host, path)) => (host, format!("/{}", path)),
            None => (rest, String::new()),
        };

        if host.is_empty() {
            return Err(model::transfer::TransportError::Storage(format!(
                "repository url has no bucket: {}",
                url
            )));
        }

        Ok(Self {
            host: host.to_string(),
            basedir,
        })
    }
}

/// Server authentication metadata supplied by the host. Either field may be
/// absent; an empty string counts as absent.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Callback for transfer progress reporting, invoked once per chunk of
/// bytes moved in either direction.
pub trait TransferProgress {
    fn notify(&mut self, chunk: &[u8]);
}

/// Progress sink that discards every notification.
pub struct NullProgress;

impl TransferProgress for NullProgress {
    fn notify(&mut self, _chunk: &[u8]) {}
}

/// The transport provider contract required by the repository client. The
/// host connects once, runs any sequence of transfer operations, then
/// disconnects. Operations other than `connect`/`disconnect` fail with
/// `NotConnected` until a session exists.
pub trait Transport {
    fn connect(
        &mut self,
        repository: &Repository,
        credentials: Option<&Credentials>,
    ) -> Result<(), model::transfer::TransportError>;

    fn disconnect(&mut self) -> Result<(), model::transfer::TransportError>;

    fn exists(&self, resource: &str) -> Result<bool, model::transfer::TransportError>;

    fn get(
        &self,
        resource: &str,
        destination: &Path,
        progress: &mut dyn TransferProgress,
    ) -> Result<(), model::transfer::TransportError>;

    fn put(
        &self,
        source: &Path,
        destination: &str,
        progress: &mut dyn TransferProgress,
    ) -> Result<(), model::transfer::TransportError>;

    fn list(&self, directory: &str) -> Result<Vec<String>, model::transfer::TransportError>;

    fn is_newer(
        &self,
        resource: &str,
        timestamp_millis: u64,
    ) -> Result<bool, model::transfer::TransportError>;
}
