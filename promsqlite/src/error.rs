//! Error types for the promsqlite remote-storage adapter.

use thiserror::Error;

/// The main error type for all adapter operations.
///
/// This enum covers every failure class the adapter can hit, from decoding
/// the wire envelope to executing storage statements. The HTTP layer maps
/// the variants onto response codes.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Error decoding an inbound request envelope.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error encoding an outbound response envelope.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error translating a query into a storage predicate.
    #[error("translate error: {0}")]
    Translate(#[from] TranslateError),

    /// Error rebuilding time series from stored rows.
    #[error("reconstruct error: {0}")]
    Reconstruct(#[from] ReconstructError),

    /// Error at the storage-engine boundary.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors that can occur while decoding a compressed protobuf envelope.
///
/// The two variants are kept distinct so callers can choose different
/// response codes for a bad compression frame versus a bad message body.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The snappy block could not be decompressed.
    #[error("failed to decompress request body: {source}")]
    Decompress {
        /// The snappy decompression error.
        #[source]
        source: snap::Error,
    },

    /// The decompressed bytes are not a valid protobuf message.
    #[error("failed to decode protobuf message: {source}")]
    Message {
        /// The protobuf decoding error.
        #[source]
        source: prost::DecodeError,
    },
}

/// Errors that can occur while encoding a response envelope.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Failed to serialize the response to protobuf.
    #[error("failed to encode protobuf message: {source}")]
    Message {
        /// The protobuf encoding error.
        #[source]
        source: prost::EncodeError,
    },

    /// Failed to compress the serialized response.
    #[error("failed to compress response body: {source}")]
    Compress {
        /// The snappy compression error.
        #[source]
        source: snap::Error,
    },
}

/// Errors that can occur while translating matchers into a SQL predicate.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// A label name failed identifier validation and cannot be safely
    /// interpolated into a JSON path.
    #[error("invalid label name {name:?}: only letters, digits, and underscore are allowed")]
    InvalidLabelName {
        /// The offending label name.
        name: String,
    },

    /// The matcher type enum value is not one this adapter understands.
    #[error("unsupported matcher type {raw}")]
    UnsupportedMatcher {
        /// The raw enum value from the wire.
        raw: i32,
    },
}

/// Errors that can occur while rebuilding time series from stored rows.
///
/// Any of these aborts the whole owning query; partial results are never
/// returned for one query.
#[derive(Error, Debug)]
pub enum ReconstructError {
    /// The `dimensions` column of a row is not a valid JSON object.
    #[error("malformed dimensions JSON in stored row: {source}")]
    InvalidDimensions {
        /// The JSON parsing error.
        #[source]
        source: serde_json::Error,
    },

    /// A numeric column of a row does not hold the expected type.
    #[error("malformed row: column '{column}' holds {sql_type}, expected a numeric value")]
    InvalidColumn {
        /// The column name.
        column: String,
        /// The SQL type actually found.
        sql_type: String,
    },
}

/// Errors at the storage-engine boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The database file could not be opened.
    #[error("failed to open database '{path}': {source}")]
    Open {
        /// The database path.
        path: String,
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// Connection setup (pragmas, regexp registration, schema bootstrap)
    /// failed.
    #[error("failed to initialize database: {source}")]
    Init {
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// A write transaction failed; the owning request is rolled back.
    #[error("write transaction failed: {source}")]
    Transaction {
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// A read query failed at the engine level.
    #[error("query failed: {source}")]
    Query {
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// Serializing a series' dimension labels to JSON failed.
    #[error("failed to serialize dimensions: {source}")]
    EncodeDimensions {
        /// The JSON serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The write serializer's consumer is no longer running.
    #[error("write serializer is not running")]
    WriterUnavailable,
}

/// Type alias for `Result<T, AdapterError>`.
pub type Result<T> = std::result::Result<T, AdapterError>;
