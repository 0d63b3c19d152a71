//! Integration tests for the translate → execute → reconstruct read path.

use promsqlite::error::AdapterError;
use promsqlite::proto::{self, METRIC_NAME_LABEL, MatcherType};
use promsqlite::storage::Storage;
use promsqlite::{Result, execute_read};

fn matcher(matcher_type: MatcherType, name: &str, value: &str) -> proto::LabelMatcher {
    proto::LabelMatcher {
        r#type: matcher_type as i32,
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn read_request(
    matchers: Vec<proto::LabelMatcher>,
    start_ms: i64,
    end_ms: i64,
) -> proto::ReadRequest {
    proto::ReadRequest {
        queries: vec![proto::Query {
            start_timestamp_ms: start_ms,
            end_timestamp_ms: end_ms,
            matchers,
        }],
    }
}

/// A storage with one `cpu_usage{host="a"}` sample at `(0.42, 1000)` and
/// one `cpu_usage{host="abc"}` sample at `(0.5, 1500)`.
fn seeded_storage() -> Storage {
    let mut storage = Storage::open_in_memory().unwrap();
    storage
        .insert_write_request(&proto::WriteRequest {
            timeseries: vec![
                proto::TimeSeries {
                    labels: vec![
                        proto::Label {
                            name: METRIC_NAME_LABEL.to_string(),
                            value: "cpu_usage".to_string(),
                        },
                        proto::Label {
                            name: "host".to_string(),
                            value: "a".to_string(),
                        },
                    ],
                    samples: vec![proto::Sample {
                        value: 0.42,
                        timestamp: 1000,
                    }],
                },
                proto::TimeSeries {
                    labels: vec![
                        proto::Label {
                            name: METRIC_NAME_LABEL.to_string(),
                            value: "cpu_usage".to_string(),
                        },
                        proto::Label {
                            name: "host".to_string(),
                            value: "abc".to_string(),
                        },
                    ],
                    samples: vec![proto::Sample {
                        value: 0.5,
                        timestamp: 1500,
                    }],
                },
            ],
        })
        .unwrap();
    storage
}

fn run(storage: &Storage, request: &proto::ReadRequest) -> Result<proto::ReadResponse> {
    execute_read(storage, request)
}

#[test]
fn test_round_trip_equality_matchers() {
    let storage = seeded_storage();
    let response = run(
        &storage,
        &read_request(
            vec![
                matcher(MatcherType::Eq, "__name__", "cpu_usage"),
                matcher(MatcherType::Eq, "host", "a"),
            ],
            0,
            2000,
        ),
    )
    .unwrap();

    assert_eq!(response.results.len(), 1);
    let series = &response.results[0].timeseries;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].labels.len(), 2);
    assert_eq!(series[0].labels[0].name, "__name__");
    assert_eq!(series[0].labels[0].value, "cpu_usage");
    assert_eq!(series[0].labels[1].name, "host");
    assert_eq!(series[0].labels[1].value, "a");
    assert_eq!(series[0].samples.len(), 1);
    assert_eq!(series[0].samples[0].value, 0.42);
    assert_eq!(series[0].samples[0].timestamp, 1000);
}

#[test]
fn test_range_bounds_are_inclusive() {
    let storage = seeded_storage();

    // [1000, 1000] includes the sample stamped exactly 1000.
    let response = run(
        &storage,
        &read_request(
            vec![matcher(MatcherType::Eq, "host", "a")],
            1000,
            1000,
        ),
    )
    .unwrap();
    assert_eq!(response.results[0].timeseries.len(), 1);
}

#[test]
fn test_range_exclusion_returns_empty_result() {
    let storage = seeded_storage();
    let response = run(
        &storage,
        &read_request(
            vec![
                matcher(MatcherType::Eq, "__name__", "cpu_usage"),
                matcher(MatcherType::Eq, "host", "a"),
            ],
            2000,
            3000,
        ),
    )
    .unwrap();

    assert_eq!(response.results.len(), 1);
    assert!(response.results[0].timeseries.is_empty());
}

#[test]
fn test_regex_matcher_semantics() {
    let storage = seeded_storage();

    // host REGEXP "a.*" matches both "a" and "abc".
    let response = run(
        &storage,
        &read_request(vec![matcher(MatcherType::Re, "host", "a.*")], 0, 2000),
    )
    .unwrap();
    assert_eq!(response.results[0].timeseries.len(), 2);

    // NOT REGEXP with the same pattern excludes both.
    let response = run(
        &storage,
        &read_request(vec![matcher(MatcherType::Nre, "host", "a.*")], 0, 2000),
    )
    .unwrap();
    assert!(response.results[0].timeseries.is_empty());

    // An anchored pattern narrows to the exact-match row only.
    let response = run(
        &storage,
        &read_request(vec![matcher(MatcherType::Re, "host", "^a$")], 0, 2000),
    )
    .unwrap();
    assert_eq!(response.results[0].timeseries.len(), 1);
    assert_eq!(response.results[0].timeseries[0].samples[0].value, 0.42);
}

#[test]
fn test_not_equal_matcher() {
    let storage = seeded_storage();
    let response = run(
        &storage,
        &read_request(vec![matcher(MatcherType::Neq, "host", "a")], 0, 2000),
    )
    .unwrap();

    let series = &response.results[0].timeseries;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].labels[1].value, "abc");
}

#[test]
fn test_multiple_queries_answered_in_request_order() {
    let storage = seeded_storage();
    let request = proto::ReadRequest {
        queries: vec![
            proto::Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 2000,
                matchers: vec![matcher(MatcherType::Eq, "host", "abc")],
            },
            proto::Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 2000,
                matchers: vec![matcher(MatcherType::Eq, "host", "a")],
            },
        ],
    };

    let response = run(&storage, &request).unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].timeseries[0].samples[0].value, 0.5);
    assert_eq!(response.results[1].timeseries[0].samples[0].value, 0.42);
}

#[test]
fn test_failing_query_aborts_whole_read_request() {
    let storage = seeded_storage();
    let request = proto::ReadRequest {
        queries: vec![
            proto::Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 2000,
                matchers: vec![matcher(MatcherType::Eq, "host", "a")],
            },
            proto::Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 2000,
                matchers: vec![matcher(MatcherType::Eq, "bad name!", "x")],
            },
        ],
    };

    let err = run(&storage, &request).unwrap_err();
    assert!(matches!(err, AdapterError::Translate(_)));
}

#[test]
fn test_injection_label_name_is_rejected_not_executed() {
    let storage = seeded_storage();
    let err = run(
        &storage,
        &read_request(
            vec![matcher(MatcherType::Eq, "\"; DROP TABLE samples; --", "x")],
            0,
            2000,
        ),
    )
    .unwrap_err();
    assert!(matches!(err, AdapterError::Translate(_)));

    // The table is still there and still answers queries.
    let response = run(
        &storage,
        &read_request(vec![matcher(MatcherType::Eq, "host", "a")], 0, 2000),
    )
    .unwrap();
    assert_eq!(response.results[0].timeseries.len(), 1);
}

#[test]
fn test_malformed_stored_dimensions_abort_the_query() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("malformed.sqlite");

    // Seed one good row, then corrupt its dimensions behind the
    // adapter's back.
    {
        let mut storage = Storage::open(&db).unwrap();
        storage
            .insert_write_request(&proto::WriteRequest {
                timeseries: vec![proto::TimeSeries {
                    labels: vec![proto::Label {
                        name: METRIC_NAME_LABEL.to_string(),
                        value: "cpu_usage".to_string(),
                    }],
                    samples: vec![proto::Sample {
                        value: 1.0,
                        timestamp: 1000,
                    }],
                }],
            })
            .unwrap();
    }
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute("UPDATE samples SET dimensions = '{not json'", [])
            .unwrap();
    }

    let storage = Storage::open(&db).unwrap();
    let err = run(
        &storage,
        &read_request(
            vec![matcher(MatcherType::Eq, "__name__", "cpu_usage")],
            0,
            2000,
        ),
    )
    .unwrap_err();
    assert!(matches!(err, AdapterError::Reconstruct(_)));
}
