//! # promsqlite
//!
//! Prometheus remote-storage adapter backed by embedded SQLite.
//!
//! promsqlite accepts batched time-series writes over the Prometheus
//! remote-write protocol (snappy-compressed protobuf), persists every
//! sample as one row in a SQLite table, and answers remote-read range
//! queries by translating label matchers into parameterized SQL
//! predicates.
//!
//! ## Key Properties
//!
//! - Single-writer serialization: one consumer thread commits write
//!   requests one transaction at a time, in submission order
//! - Depth-one handoff as the only write backpressure
//! - Injection-safe query translation: matcher values are always bound
//!   parameters, label names are validated before touching SQL text
//! - Regex matchers via a `regexp` scalar function registered on every
//!   connection, backed by the `regex` crate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promsqlite::{Storage, WriteSerializer, execute_read};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One connection for the single writer...
//! let writer = WriteSerializer::spawn(Storage::open("timeseries.sqlite")?);
//!
//! let request = promsqlite::codec::decode_write(&[/* snappy protobuf */])?;
//! writer.submit(request).await?;
//!
//! // ...and independent connections for concurrent readers.
//! let storage = Storage::open("timeseries.sqlite")?;
//! let read = promsqlite::codec::decode_read(&[/* snappy protobuf */])?;
//! let response = execute_read(&storage, &read)?;
//! let body = promsqlite::codec::encode_read_response(&response)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`codec`] — snappy + protobuf wire envelope
//! - [`translate`] — label matchers to SQL predicate
//! - [`reconstruct`] — stored rows back to time series
//! - [`writer`] — serialized, FIFO write ingestion
//! - [`read`] — per-request read orchestration
//! - [`storage`] — the narrow SQLite contract
//! - [`proto`] — prompb message subset
//! - [`error`] — error types

pub mod codec;
pub mod error;
pub mod proto;
pub mod read;
pub mod reconstruct;
pub mod storage;
pub mod translate;
pub mod writer;

// Re-export primary API types at crate root for convenience.
pub use error::{AdapterError, Result};
pub use read::execute_read;
pub use storage::Storage;
pub use writer::WriteSerializer;
