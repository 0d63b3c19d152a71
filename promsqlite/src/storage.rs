//! SQLite storage wrapper.
//!
//! The adapter consumes SQLite through a narrow contract: open a
//! connection, register the `regexp` scalar function, bootstrap the
//! schema, run one write transaction per request, and execute translated
//! read predicates. Everything SQLite-specific lives here.
//!
//! Each [`Storage`] owns exactly one connection. The write serializer owns
//! one for the life of the process; the read path opens one per request
//! and relies on SQLite's own concurrency control (WAL journaling) instead
//! of any adapter-level locking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;

use crate::error::{AdapterError, ReconstructError, StorageError};
use crate::proto::{self, METRIC_NAME_LABEL};
use crate::translate::SamplePredicate;

/// One persisted sample, as selected from the `samples` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    /// The metric name (the `__name__` label).
    pub name: String,
    /// The non-reserved labels, as a JSON object document.
    pub dimensions: String,
    /// The sample value.
    pub value: f64,
    /// The sample timestamp, milliseconds since epoch.
    pub timestamp: i64,
}

/// Schema bootstrap script, applied lazily on every open.
///
/// `value` is intentionally nullable; the read path filters on
/// `value IS NOT NULL`.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS samples (
    name TEXT NOT NULL,
    dimensions TEXT NOT NULL,
    value REAL,
    timestamp INTEGER NOT NULL
);";

const INSERT_SAMPLE_SQL: &str =
    "INSERT INTO samples (name, dimensions, value, timestamp) VALUES (?1, ?2, ?3, ?4)";

const SELECT_SAMPLES_SQL: &str = "SELECT name, dimensions, value, timestamp FROM samples WHERE ";

/// A single SQLite connection with the adapter's schema and the `regexp`
/// function in place.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened and
    /// [`StorageError::Init`] if connection setup fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::init(conn)
    }

    /// Opens the database at `path` without bootstrapping it.
    ///
    /// For read connections against a database a writer connection has
    /// already initialized: only the per-connection pieces (the `regexp`
    /// function, synchronous mode, the busy timeout) are set up. WAL
    /// journaling persists in the database file and the schema already
    /// exists, so neither is re-applied.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened and
    /// [`StorageError::Init`] if connection setup fails. Queries against
    /// a database nothing has bootstrapped fail with
    /// [`StorageError::Query`].
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        register_regexp(&conn).map_err(|e| StorageError::Init { source: e })?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StorageError::Init { source: e })?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if connection setup fails.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Open {
            path: ":memory:".to_string(),
            source: e,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        register_regexp(&conn).map_err(|e| StorageError::Init { source: e })?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StorageError::Init { source: e })?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StorageError::Init { source: e })?;
        Ok(Self { conn })
    }

    /// Persists one write request in a single transaction.
    ///
    /// For every series the labels are partitioned once into `__name__`
    /// and dimensions (serialized as a JSON object), then one row is
    /// inserted per sample. All rows commit together or not at all.
    ///
    /// Returns the number of samples inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if any insertion or the commit fails; the
    /// transaction is rolled back and no rows from the request survive.
    pub fn insert_write_request(
        &mut self,
        request: &proto::WriteRequest,
    ) -> Result<usize, StorageError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::Transaction { source: e })?;

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare_cached(INSERT_SAMPLE_SQL)
                .map_err(|e| StorageError::Transaction { source: e })?;

            for series in &request.timeseries {
                let (name, dimensions) = split_labels(&series.labels);
                let dimensions_json = serde_json::to_string(&dimensions)
                    .map_err(|e| StorageError::EncodeDimensions { source: e })?;

                for sample in &series.samples {
                    stmt.execute(rusqlite::params![
                        name,
                        dimensions_json,
                        sample.value,
                        sample.timestamp
                    ])
                    .map_err(|e| StorageError::Transaction { source: e })?;
                    inserted += 1;
                }
            }
        }

        tx.commit()
            .map_err(|e| StorageError::Transaction { source: e })?;
        Ok(inserted)
    }

    /// Executes a translated predicate and returns the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] for engine-level failures and
    /// [`ReconstructError::InvalidColumn`] if a numeric column does not
    /// hold the expected type.
    pub fn query_samples(&self, predicate: &SamplePredicate) -> Result<Vec<SampleRow>, AdapterError> {
        let sql = format!("{SELECT_SAMPLES_SQL}{}", predicate.where_clause);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StorageError::Query { source: e })?;
        let mut rows = stmt
            .query(rusqlite::params_from_iter(predicate.params.iter()))
            .map_err(|e| StorageError::Query { source: e })?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| StorageError::Query { source: e })?
        {
            out.push(SampleRow {
                name: column(row, 0)?,
                dimensions: column(row, 1)?,
                value: column(row, 2)?,
                timestamp: column(row, 3)?,
            });
        }
        Ok(out)
    }
}

/// Extracts one column, mapping a type mismatch to the reconstruction
/// taxonomy (a row with a non-numeric value/timestamp is a malformed row,
/// not an engine failure).
fn column<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<T, AdapterError> {
    row.get(idx).map_err(|e| match e {
        rusqlite::Error::InvalidColumnType(_, column, sql_type) => {
            AdapterError::Reconstruct(ReconstructError::InvalidColumn {
                column,
                sql_type: sql_type.to_string(),
            })
        }
        other => AdapterError::Storage(StorageError::Query { source: other }),
    })
}

/// Partitions a series' labels into the metric name and the dimension map.
///
/// Label names are unique within a series, so the map cannot lose entries.
/// A series without `__name__` gets an empty name rather than an error;
/// the write path accepts whatever the scraper sent.
fn split_labels(labels: &[proto::Label]) -> (&str, BTreeMap<&str, &str>) {
    let mut name = "";
    let mut dimensions = BTreeMap::new();
    for label in labels {
        if label.name == METRIC_NAME_LABEL {
            name = label.value.as_str();
        } else {
            dimensions.insert(label.name.as_str(), label.value.as_str());
        }
    }
    (name, dimensions)
}

/// Registers the two-argument `regexp(pattern, text)` scalar function.
///
/// SQLite rewrites `x REGEXP y` into `regexp(y, x)`, so the pattern is the
/// first argument. The compiled regex is cached in SQLite's auxdata slot,
/// so a query re-compiles each pattern once rather than once per row. A
/// NULL text argument (a row lacking the label) never matches, which makes
/// `NOT REGEXP` select such rows.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(
                0,
                |vr| -> Result<_, Box<dyn std::error::Error + Send + Sync + 'static>> {
                    Ok(Regex::new(vr.as_str()?)?)
                },
            )?;

            match ctx.get_raw(1) {
                ValueRef::Null => Ok(false),
                text => {
                    let text = text
                        .as_str()
                        .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
                    Ok(pattern.is_match(text))
                }
            }
        },
    )
}
