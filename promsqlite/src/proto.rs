//! Prometheus remote read/write protobuf types.
//!
//! Hand-written types matching the subset of `prometheus/prompb` this
//! adapter speaks. Using prost derives avoids the need for protoc and
//! proto file management.

/// A write request containing one or more time series.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteRequest {
    /// The time series to write.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// A read request containing one or more range queries.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequest {
    /// The queries to execute.
    #[prost(message, repeated, tag = "1")]
    pub queries: Vec<Query>,
}

/// A single label-matcher + time-range query.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Query {
    /// Inclusive range start, milliseconds since epoch.
    #[prost(int64, tag = "1")]
    pub start_timestamp_ms: i64,
    /// Inclusive range end, milliseconds since epoch.
    #[prost(int64, tag = "2")]
    pub end_timestamp_ms: i64,
    /// Label matchers; all must hold for a row to be selected.
    #[prost(message, repeated, tag = "3")]
    pub matchers: Vec<LabelMatcher>,
}

/// A single label-based filter condition.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LabelMatcher {
    /// The matcher semantics, as a raw [`MatcherType`] value.
    #[prost(enumeration = "MatcherType", tag = "1")]
    pub r#type: i32,
    /// The label name to match on.
    #[prost(string, tag = "2")]
    pub name: String,
    /// The value (or regex pattern) to match against.
    #[prost(string, tag = "3")]
    pub value: String,
}

/// Matcher semantics for a [`LabelMatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MatcherType {
    /// Exact equality.
    Eq = 0,
    /// Exact inequality.
    Neq = 1,
    /// Regular-expression match.
    Re = 2,
    /// Negated regular-expression match.
    Nre = 3,
}

/// A read response carrying one result per query, in request order.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadResponse {
    /// One result per query of the originating [`ReadRequest`].
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<QueryResult>,
}

/// The time series matched by a single query.
#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryResult {
    /// The matched series.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// A single time series with labels and samples.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TimeSeries {
    /// Metric labels identifying the series.
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    /// Data samples for this series.
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// A key-value label pair.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Label {
    /// Label name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Label value.
    #[prost(string, tag = "2")]
    pub value: String,
}

/// A single data sample (value + timestamp).
#[derive(Clone, PartialEq, prost::Message)]
pub struct Sample {
    /// The sample value.
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Timestamp in milliseconds since epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

/// The reserved label designating a series' metric identity.
pub const METRIC_NAME_LABEL: &str = "__name__";
