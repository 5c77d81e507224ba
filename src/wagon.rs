use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
    time::{Duration, SystemTime},
};

use tracing::{debug, info, span, Level};

use crate::{adapters, model, transport, util};

/// Buffer size for local reads and writes; the progress sink is notified
/// once per chunk of this size.
pub const CHUNK_SIZE: usize = 1024;

struct Session {
    client: Box<dyn adapters::ObjectClient>,
    bucket: String,
    basedir: String,
}

impl Session {
    fn key_for(&self, resource: &str) -> String {
        format!("{}{}", self.basedir, resource)
    }
}

/// Transport provider backed by an object-storage bucket. Repository URLs
/// of the form `s3://bucket-name/base/path` map the host to the bucket and
/// the path to a key prefix. One instance carries at most one session and
/// is not safe for concurrent use; the host serializes calls.
pub struct S3Wagon {
    factory: Box<dyn adapters::ClientFactory>,
    session: Option<Session>,
}

impl S3Wagon {
    pub fn new(factory: Box<dyn adapters::ClientFactory>) -> Self {
        Self {
            factory,
            session: None,
        }
    }

    fn session(&self) -> Result<&Session, model::transfer::TransportError> {
        self.session
            .as_ref()
            .ok_or(model::transfer::TransportError::NotConnected)
    }
}

impl Default for S3Wagon {
    fn default() -> Self {
        Self::new(Box::new(adapters::s3::S3ClientFactory))
    }
}

/// Resolves host authentication metadata into static credentials. Absent
/// metadata means anonymous access; a pair with exactly one usable field is
/// an authentication error. Empty strings count as absent fields.
fn resolve_credentials(
    credentials: Option<&transport::Credentials>,
) -> Result<Option<adapters::StaticCredentials>, model::transfer::TransportError> {
    let info = match credentials {
        None => return Ok(None),
        Some(info) => info,
    };

    let access_key = info.access_key.as_deref().filter(|v| !v.is_empty());
    let secret_key = info.secret_key.as_deref().filter(|v| !v.is_empty());

    match (access_key, secret_key) {
        (None, None) => Ok(None),
        (Some(access_key), Some(secret_key)) => Ok(Some(adapters::StaticCredentials {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })),
        _ => Err(model::transfer::TransportError::Authentication(
            "both an access key and a secret key must be set".to_string(),
        )),
    }
}

/// Collapses a metadata lookup into a bare existence answer. Not-found and
/// client failures both read as absent; the swallowed failure is logged so
/// transient errors are not silently lost.
fn existence_probe(
    resource: &str,
    lookup: Result<Option<model::transfer::RemoteObject>, model::transfer::TransportError>,
) -> bool {
    match lookup {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(err) => {
            debug!(error_message=%err, error_group="head_object", resource=resource, "probe swallowed failure");
            false
        }
    }
}

impl transport::Transport for S3Wagon {
    fn connect(
        &mut self,
        repository: &transport::Repository,
        credentials: Option<&transport::Credentials>,
    ) -> Result<(), model::transfer::TransportError> {
        let span = span!(Level::INFO, "connect", context = "connect");
        let _e = span.enter();
        info!(host = %repository.host, basedir = %repository.basedir, "called");

        let resolved = resolve_credentials(credentials)?;
        let client = self.factory.open(resolved.as_ref())?;

        self.session = Some(Session {
            client,
            bucket: repository.host.clone(),
            basedir: util::path::base_dir(&repository.basedir),
        });

        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), model::transfer::TransportError> {
        let span = span!(Level::INFO, "disconnect", context = "disconnect");
        let _e = span.enter();
        info!("called");

        // Nothing to release remotely; dropping the session is enough.
        self.session = None;

        Ok(())
    }

    fn exists(&self, resource: &str) -> Result<bool, model::transfer::TransportError> {
        let span = span!(Level::INFO, "exists", context = "exists");
        let _e = span.enter();
        info!(resource = resource, "called");

        let session = self.session()?;
        let key = session.key_for(resource);

        Ok(existence_probe(
            resource,
            session.client.head_object(&session.bucket, &key),
        ))
    }

    fn get(
        &self,
        resource: &str,
        destination: &Path,
        progress: &mut dyn transport::TransferProgress,
    ) -> Result<(), model::transfer::TransportError> {
        let span = span!(Level::INFO, "get", context = "get");
        let _e = span.enter();
        info!(resource = resource, destination = %destination.display(), "called");

        let session = self.session()?;
        let key = session.key_for(resource);

        let body = match session.client.get_object(&session.bucket, &key) {
            Ok(Some(body)) => body,
            Ok(None) => {
                return Err(model::transfer::TransportError::ResourceNotFound(
                    resource.to_string(),
                ));
            }
            Err(err) => {
                debug!(error_message=%err, error_group="get_object", "retrieval failure reads as missing");
                return Err(model::transfer::TransportError::ResourceNotFound(
                    resource.to_string(),
                ));
            }
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| model::transfer::TransportError::local_io(parent, err))?;
            }
        }

        let mut out = File::create(destination)
            .map_err(|err| model::transfer::TransportError::local_io(destination, err))?;

        for chunk in body.chunks(CHUNK_SIZE) {
            out.write_all(chunk)
                .map_err(|err| model::transfer::TransportError::local_io(destination, err))?;
            progress.notify(chunk);
        }

        Ok(())
    }

    fn put(
        &self,
        source: &Path,
        destination: &str,
        progress: &mut dyn transport::TransferProgress,
    ) -> Result<(), model::transfer::TransportError> {
        let span = span!(Level::INFO, "put", context = "put");
        let _e = span.enter();
        info!(source = %source.display(), destination = destination, "called");

        let session = self.session()?;

        // Zero-length markers simulate the destination's parent directories
        // in the flat key namespace, created root first.
        for prefix in util::path::parent_prefixes(destination) {
            let marker = session.key_for(&prefix);
            session.client.put_object(&session.bucket, &marker, None)?;
        }

        let mut file = File::open(source)
            .map_err(|err| model::transfer::TransportError::local_io(source, err))?;

        let mut body = Vec::new();
        let mut buffer = [0u8; CHUNK_SIZE];
        loop {
            let length = file
                .read(&mut buffer)
                .map_err(|err| model::transfer::TransportError::local_io(source, err))?;
            if length == 0 {
                break;
            }

            progress.notify(&buffer[..length]);
            body.extend_from_slice(&buffer[..length]);
        }

        let key = session.key_for(destination);
        session.client.put_object(&session.bucket, &key, Some(body))?;

        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, model::transfer::TransportError> {
        let span = span!(Level::INFO, "list", context = "list");
        let _e = span.enter();
        info!(directory = directory, "called");

        let session = self.session()?;
        let prefix = session.key_for(directory);

        let objects = session.client.list_objects(&session.bucket, &prefix)?;

        Ok(objects.into_iter().map(|o| o.key).collect())
    }

    fn is_newer(
        &self,
        resource: &str,
        timestamp_millis: u64,
    ) -> Result<bool, model::transfer::TransportError> {
        let span = span!(Level::INFO, "is_newer", context = "is_newer");
        let _e = span.enter();
        info!(resource = resource, timestamp_millis = timestamp_millis, "called");

        let session = self.session()?;
        let key = session.key_for(resource);

        let object = session
            .client
            .head_object(&session.bucket, &key)?
            .ok_or_else(|| model::transfer::TransportError::ResourceNotFound(resource.to_string()))?;

        // True when the remote copy was modified strictly after the given
        // time, per the operation's name.
        let threshold = SystemTime::UNIX_EPOCH + Duration::from_millis(timestamp_millis);

        Ok(object.modified_time > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{FailingFactory, MockClient, MockFactory};
    use crate::transport::{Credentials, NullProgress, Repository, Transport, TransferProgress};

    struct CountingProgress {
        chunks: usize,
        bytes: usize,
    }

    impl CountingProgress {
        fn new() -> Self {
            Self { chunks: 0, bytes: 0 }
        }
    }

    impl TransferProgress for CountingProgress {
        fn notify(&mut self, chunk: &[u8]) {
            self.chunks += 1;
            self.bytes += chunk.len();
        }
    }

    fn connected_wagon(url: &str) -> (S3Wagon, MockClient) {
        let client = MockClient::new();
        let mut wagon = S3Wagon::new(Box::new(MockFactory {
            client: client.clone(),
        }));

        let repository = Repository::parse(url).unwrap();
        wagon.connect(&repository, None).unwrap();

        (wagon, client)
    }

    #[test]
    fn test_connect_credentials() {
        let cases = vec![
            (None, None, true),
            (Some("AKIA"), Some("secret"), true),
            (Some("AKIA"), None, false),
            (None, Some("secret"), false),
            (Some("AKIA"), Some(""), false),
            (Some(""), Some("secret"), false),
            (Some(""), Some(""), true),
        ];

        for (access_key, secret_key, expected_ok) in cases {
            let mut wagon = S3Wagon::new(Box::new(MockFactory {
                client: MockClient::new(),
            }));
            let repository = Repository::parse("s3://test-bucket/releases/").unwrap();
            let credentials = Credentials {
                access_key: access_key.map(str::to_string),
                secret_key: secret_key.map(str::to_string),
            };

            let result = wagon.connect(&repository, Some(&credentials));

            assert_eq!(
                result.is_ok(),
                expected_ok,
                "failed for case: {:?}/{:?}",
                access_key,
                secret_key
            );
            if !expected_ok {
                assert!(
                    matches!(
                        result,
                        Err(model::transfer::TransportError::Authentication(_))
                    ),
                    "failed on error kind for case: {:?}/{:?}",
                    access_key,
                    secret_key
                );
            }
        }
    }

    #[test]
    fn test_operations_require_session() {
        let wagon = S3Wagon::new(Box::new(MockFactory {
            client: MockClient::new(),
        }));

        assert!(matches!(
            wagon.exists("a"),
            Err(model::transfer::TransportError::NotConnected)
        ));
        assert!(matches!(
            wagon.list("a/"),
            Err(model::transfer::TransportError::NotConnected)
        ));
        assert!(matches!(
            wagon.is_newer("a", 0),
            Err(model::transfer::TransportError::NotConnected)
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            wagon.get("a", &dir.path().join("a"), &mut NullProgress),
            Err(model::transfer::TransportError::NotConnected)
        ));

        let source = dir.path().join("src");
        std::fs::write(&source, b"x").unwrap();
        assert!(matches!(
            wagon.put(&source, "a", &mut NullProgress),
            Err(model::transfer::TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_drops_session() {
        let (mut wagon, _client) = connected_wagon("s3://test-bucket/releases/");

        wagon.disconnect().unwrap();

        assert!(matches!(
            wagon.exists("a"),
            Err(model::transfer::TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_round_trip() {
        // Sizes straddle the chunk boundary on both sides.
        let cases = vec![
            (0usize, 0usize),
            (1, 1),
            (1023, 1),
            (1024, 1),
            (1025, 2),
        ];

        for (size, expected_chunks) in cases {
            let (wagon, _client) = connected_wagon("s3://test-bucket/releases/");
            let dir = tempfile::tempdir().unwrap();

            let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let source = dir.path().join("source.bin");
            std::fs::write(&source, &content).unwrap();

            let mut up = CountingProgress::new();
            wagon.put(&source, "dir/source.bin", &mut up).unwrap();
            assert_eq!(up.chunks, expected_chunks, "failed on upload chunks for case: {}", size);
            assert_eq!(up.bytes, size, "failed on upload bytes for case: {}", size);

            let destination = dir.path().join("fetched.bin");
            let mut down = CountingProgress::new();
            wagon.get("dir/source.bin", &destination, &mut down).unwrap();
            assert_eq!(down.chunks, expected_chunks, "failed on download chunks for case: {}", size);
            assert_eq!(down.bytes, size, "failed on download bytes for case: {}", size);

            let fetched = std::fs::read(&destination).unwrap();
            assert_eq!(fetched, content, "failed on content for case: {}", size);
        }
    }

    #[test]
    fn test_exists_before_and_after_put() {
        let (wagon, _client) = connected_wagon("s3://test-bucket/releases/");
        let dir = tempfile::tempdir().unwrap();

        assert!(!wagon.exists("com/example/1.0.jar").unwrap());

        let source = dir.path().join("1.0.jar");
        std::fs::write(&source, vec![7u8; 500]).unwrap();
        wagon
            .put(&source, "com/example/1.0.jar", &mut NullProgress)
            .unwrap();

        assert!(wagon.exists("com/example/1.0.jar").unwrap());
    }

    #[test]
    fn test_exists_swallows_client_failures() {
        let mut wagon = S3Wagon::new(Box::new(FailingFactory));
        let repository = Repository::parse("s3://test-bucket/releases/").unwrap();
        wagon.connect(&repository, None).unwrap();

        assert_eq!(wagon.exists("anything").unwrap(), false);
    }

    #[test]
    fn test_put_creates_markers_and_sets_length() {
        let (wagon, client) = connected_wagon("s3://test-bucket/releases/");
        let dir = tempfile::tempdir().unwrap();

        let source = dir.path().join("1.0.jar");
        std::fs::write(&source, vec![42u8; 500]).unwrap();
        wagon
            .put(&source, "com/example/1.0.jar", &mut NullProgress)
            .unwrap();

        let object = client.body_of("test-bucket", "releases/com/example/1.0.jar");
        assert_eq!(object.map(|b| b.len()), Some(500));

        for marker in ["com/", "com/example/"] {
            assert!(wagon.exists(marker).unwrap(), "failed for case: {}", marker);
        }
        assert_eq!(
            client.body_of("test-bucket", "releases/com/").map(|b| b.len()),
            Some(0)
        );

        // The final object plus exactly one marker per parent segment.
        assert_eq!(client.key_count(), 3);
    }

    #[test]
    fn test_put_without_parent_creates_no_markers() {
        let (wagon, client) = connected_wagon("s3://test-bucket/releases/");
        let dir = tempfile::tempdir().unwrap();

        let source = dir.path().join("flat.jar");
        std::fs::write(&source, b"jar").unwrap();
        wagon.put(&source, "flat.jar", &mut NullProgress).unwrap();

        assert_eq!(client.key_count(), 1);
        assert!(client.body_of("test-bucket", "releases/flat.jar").is_some());
    }

    #[test]
    fn test_get_missing_resource() {
        let (wagon, _client) = connected_wagon("s3://test-bucket/releases/");
        let dir = tempfile::tempdir().unwrap();

        let result = wagon.get("no/such.jar", &dir.path().join("out"), &mut NullProgress);

        assert!(matches!(
            result,
            Err(model::transfer::TransportError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_get_unfetchable_reads_as_missing() {
        let mut wagon = S3Wagon::new(Box::new(FailingFactory));
        let repository = Repository::parse("s3://test-bucket/releases/").unwrap();
        wagon.connect(&repository, None).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = wagon.get("broken.jar", &dir.path().join("out"), &mut NullProgress);

        assert!(matches!(
            result,
            Err(model::transfer::TransportError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_get_creates_parent_directories() {
        let (wagon, client) = connected_wagon("s3://test-bucket/releases/");
        let dir = tempfile::tempdir().unwrap();

        client.insert_with_time(
            "test-bucket",
            "releases/a.txt",
            b"hello".to_vec(),
            SystemTime::now(),
        );

        let destination = dir.path().join("deeply/nested/a.txt");
        wagon.get("a.txt", &destination, &mut NullProgress).unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"hello");
    }

    #[test]
    fn test_list_returns_full_keys_under_prefix() {
        let (wagon, client) = connected_wagon("s3://test-bucket/releases/");

        for key in ["releases/a/x", "releases/a/y", "releases/b/z"] {
            client.insert_with_time("test-bucket", key, Vec::new(), SystemTime::now());
        }

        let result = wagon.list("a/").unwrap();

        assert_eq!(result, vec!["releases/a/x", "releases/a/y"]);
    }

    #[test]
    fn test_is_newer() {
        let (wagon, client) = connected_wagon("s3://test-bucket/releases/");

        client.insert_with_time(
            "test-bucket",
            "releases/1.0.jar",
            Vec::new(),
            SystemTime::UNIX_EPOCH + Duration::from_millis(1_000),
        );

        let cases = vec![(500u64, true), (1_000, false), (2_000, false)];

        for (timestamp, expected) in cases {
            let result = wagon.is_newer("1.0.jar", timestamp).unwrap();
            assert_eq!(result, expected, "failed for case: {}", timestamp);
        }

        assert!(matches!(
            wagon.is_newer("missing.jar", 0),
            Err(model::transfer::TransportError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_credentials() {
        assert!(resolve_credentials(None).unwrap().is_none());

        let anonymous = Credentials::default();
        assert!(resolve_credentials(Some(&anonymous)).unwrap().is_none());

        let full = Credentials {
            access_key: Some("AKIA".to_string()),
            secret_key: Some("secret".to_string()),
        };
        let resolved = resolve_credentials(Some(&full)).unwrap().unwrap();
        assert_eq!(resolved.access_key, "AKIA");
        assert_eq!(resolved.secret_key, "secret");
    }
}
