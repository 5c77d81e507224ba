use crate::model;

pub mod mock;
pub mod s3;

/// The narrow slice of an object-storage client the transport needs. Bucket
/// and key are passed explicitly on every call; the client itself carries
/// only connection and credential state.
pub trait ObjectClient {
    /// Stores an object. `None` writes a zero-length body, used for
    /// directory marker objects. The content length sent to the service is
    /// taken from the body.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), model::transfer::TransportError>;

    /// Fetches object metadata. `Ok(None)` means the key does not exist;
    /// transient failures surface as errors.
    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::transfer::RemoteObject>, model::transfer::TransportError>;

    /// Fetches the full object body. `Ok(None)` means the key does not
    /// exist.
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::transfer::TransportError>;

    /// Lists every key under `prefix` with no delimiter, in the order the
    /// service reports them.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::transfer::RemoteObject>, model::transfer::TransportError>;
}

/// Validated static credentials handed to a factory at connect time.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Opens an authenticated client session. The transport resolves host
/// credentials first; `None` requests anonymous access.
pub trait ClientFactory {
    fn open(
        &self,
        credentials: Option<&StaticCredentials>,
    ) -> Result<Box<dyn ObjectClient>, model::transfer::TransportError>;
}
