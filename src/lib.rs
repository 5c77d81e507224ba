//! Transport provider for build-artifact repositories hosted in object
//! storage. Repository URLs of the form `s3://bucket-name/base/path` put
//! artifacts into `bucket-name` under the `base/path` prefix; the host's
//! server authentication metadata supplies the access and secret keys.
//!
//! The host build tool owns the lifecycle: it connects a [`S3Wagon`], runs
//! any sequence of transfer operations through the [`Transport`] contract,
//! then disconnects. Everything below the contract is a thin delegation to
//! an [`adapters::ObjectClient`], implemented for `aws_sdk_s3::Client` and
//! for an in-memory mock.

pub mod adapters;
pub mod model;
pub mod transport;
pub mod util;
pub mod wagon;

pub use model::transfer::{RemoteObject, TransportError};
pub use transport::{Credentials, NullProgress, Repository, Transport, TransferProgress};
pub use wagon::{S3Wagon, CHUNK_SIZE};
