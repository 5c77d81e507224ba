use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use crate::{adapters, model};

#[derive(Clone, Debug)]
struct StoredObject {
    body: Vec<u8>,
    modified_time: SystemTime,
}

/// In-memory stand-in for a real storage service. Keys are ordered
/// lexicographically, matching the listing order S3 reports. Cloning
/// shares the underlying store, so a test can keep a handle to inspect
/// state behind a connected transport.
#[derive(Clone, Default)]
pub struct MockClient {
    objects: Arc<Mutex<BTreeMap<(String, String), StoredObject>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object with a chosen modification time.
    pub fn insert_with_time(&self, bucket: &str, key: &str, body: Vec<u8>, modified: SystemTime) {
        self.objects
            .lock()
            .expect("failed to acquire `objects` guard")
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    body,
                    modified_time: modified,
                },
            );
    }

    pub fn body_of(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("failed to acquire `objects` guard")
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    pub fn key_count(&self) -> usize {
        self.objects
            .lock()
            .expect("failed to acquire `objects` guard")
            .len()
    }
}

impl adapters::ObjectClient for MockClient {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), model::transfer::TransportError> {
        self.insert_with_time(bucket, key, body.unwrap_or_default(), SystemTime::now());

        Ok(())
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::transfer::RemoteObject>, model::transfer::TransportError> {
        let objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        Ok(objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| model::transfer::RemoteObject {
                key: key.to_string(),
                size: o.body.len() as i64,
                modified_time: o.modified_time,
            }))
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::transfer::TransportError> {
        Ok(self.body_of(bucket, key))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::transfer::RemoteObject>, model::transfer::TransportError> {
        let objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        Ok(objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), o)| model::transfer::RemoteObject {
                key: k.clone(),
                size: o.body.len() as i64,
                modified_time: o.modified_time,
            })
            .collect())
    }
}

/// Factory handing out clones of one shared `MockClient`.
pub struct MockFactory {
    pub client: MockClient,
}

impl adapters::ClientFactory for MockFactory {
    fn open(
        &self,
        _credentials: Option<&adapters::StaticCredentials>,
    ) -> Result<Box<dyn adapters::ObjectClient>, model::transfer::TransportError> {
        Ok(Box::new(self.client.clone()))
    }
}

/// Client whose every call fails, for exercising error paths.
pub struct FailingClient;

impl adapters::ObjectClient for FailingClient {
    fn put_object(
        &self,
        _bucket: &str,
        key: &str,
        _body: Option<Vec<u8>>,
    ) -> Result<(), model::transfer::TransportError> {
        Err(model::transfer::TransportError::Storage(format!(
            "failed to put_object at: {}, injected failure",
            key
        )))
    }

    fn head_object(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Option<model::transfer::RemoteObject>, model::transfer::TransportError> {
        Err(model::transfer::TransportError::Storage(format!(
            "failed to head_object at: {}, injected failure",
            key
        )))
    }

    fn get_object(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::transfer::TransportError> {
        Err(model::transfer::TransportError::Storage(format!(
            "failed to get_object at: {}, injected failure",
            key
        )))
    }

    fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::transfer::RemoteObject>, model::transfer::TransportError> {
        Err(model::transfer::TransportError::Storage(format!(
            "failed to list_objects at: {}, injected failure",
            prefix
        )))
    }
}

/// Factory handing out `FailingClient`s.
pub struct FailingFactory;

impl adapters::ClientFactory for FailingFactory {
    fn open(
        &self,
        _credentials: Option<&adapters::StaticCredentials>,
    ) -> Result<Box<dyn adapters::ObjectClient>, model::transfer::TransportError> {
        Ok(Box::new(FailingClient))
    }
}
