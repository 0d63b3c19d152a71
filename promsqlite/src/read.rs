//! Read-path orchestration: translate, execute, reconstruct.

use crate::error::Result;
use crate::proto;
use crate::reconstruct::reconstruct;
use crate::storage::Storage;
use crate::translate::translate;

/// Executes every query of a read request independently, concatenating
/// results in request order.
///
/// # Errors
///
/// The first query to fail (translation, execution, or reconstruction)
/// aborts the whole request; there is no partial-success reporting.
pub fn execute_read(
    storage: &Storage,
    request: &proto::ReadRequest,
) -> Result<proto::ReadResponse> {
    let mut results = Vec::with_capacity(request.queries.len());

    for query in &request.queries {
        let predicate = translate(query)?;
        tracing::debug!(
            where_clause = %predicate.where_clause,
            params = predicate.params.len(),
            "executing translated query"
        );
        let rows = storage.query_samples(&predicate)?;
        let timeseries = reconstruct(&rows)?;
        results.push(proto::QueryResult { timeseries });
    }

    Ok(proto::ReadResponse { results })
}
