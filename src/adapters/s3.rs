use std::time::{Duration, SystemTime};

use aws_sdk_s3::primitives::ByteStream;

use crate::{adapters, model, util};

/// Opens `aws_sdk_s3::Client` handles. Static credentials are used when the
/// host supplies them; otherwise the session is anonymous.
pub struct S3ClientFactory;

impl adapters::ClientFactory for S3ClientFactory {
    fn open(
        &self,
        credentials: Option<&adapters::StaticCredentials>,
    ) -> Result<Box<dyn adapters::ObjectClient>, model::transfer::TransportError> {
        let loader = match credentials {
            Some(creds) => aws_config::from_env().credentials_provider(
                aws_sdk_s3::config::Credentials::new(
                    creds.access_key.clone(),
                    creds.secret_key.clone(),
                    None,
                    None,
                    "s3-wagon",
                ),
            ),
            None => aws_config::from_env().no_credentials(),
        };

        let config = util::poll::block_on(loader.load());

        Ok(Box::new(aws_sdk_s3::Client::new(&config)))
    }
}

impl adapters::ObjectClient for aws_sdk_s3::Client {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), model::transfer::TransportError> {
        let bytes = body.unwrap_or_default();
        let req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(bytes.len() as i64)
            .body(ByteStream::from(bytes));

        util::poll::block_on(req.send()).map_err(|err| {
            model::transfer::TransportError::Storage(format!(
                "failed to put_object at: {}, {}",
                key, err
            ))
        })?;

        Ok(())
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::transfer::RemoteObject>, model::transfer::TransportError> {
        let req = self.head_object().bucket(bucket).key(key);

        let ho = match util::poll::block_on(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(model::transfer::TransportError::Storage(format!(
                    "failed to head_object at: {}, {}",
                    key, err
                )));
            }
            Ok(ho) => ho,
        };

        Ok(Some(model::transfer::RemoteObject {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            modified_time: to_system_time(ho.last_modified()),
        }))
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::transfer::TransportError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = match util::poll::block_on(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(model::transfer::TransportError::Storage(format!(
                    "failed to get_object at: {}, {}",
                    key, err
                )));
            }
            Ok(o) => o,
        };

        let bytes = util::poll::block_on(o.body.collect()).map_err(|err| {
            model::transfer::TransportError::Storage(format!(
                "failed to collect body at: {}, {}",
                key, err
            ))
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<model::transfer::RemoteObject>, model::transfer::TransportError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = util::poll::block_on(req.send()).map_err(|err| {
                model::transfer::TransportError::Storage(format!(
                    "failed to list_objects at: {}, {}",
                    prefix, err
                ))
            })?;

            for o in lo.contents() {
                objects.push(model::transfer::RemoteObject {
                    key: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0),
                    modified_time: to_system_time(o.last_modified()),
                });
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }
}

fn to_system_time(stamp: Option<&aws_sdk_s3::primitives::DateTime>) -> SystemTime {
    match stamp {
        Some(dt) => SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos()),
        None => SystemTime::UNIX_EPOCH,
    }
}
