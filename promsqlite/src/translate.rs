//! Query translation from label matchers to a SQL predicate.
//!
//! This module turns a [`proto::Query`] (a set of label matchers plus an
//! inclusive time range) into a WHERE clause over the `samples` table and
//! an ordered list of bound parameters. It never executes anything; the
//! storage layer owns execution.
//!
//! # Injection safety
//!
//! Matcher *values* are always bound parameters. Label *names* cannot be
//! bound because they end up inside a SQLite JSON path literal
//! (`json_extract(dimensions, '$.host')`), so they are validated against a
//! strict identifier alphabet before any SQL text is built. A name that
//! fails validation rejects the query with
//! [`TranslateError::InvalidLabelName`] and no fragment is ever emitted
//! for it.

use rusqlite::types::Value;

use crate::error::TranslateError;
use crate::proto::{self, METRIC_NAME_LABEL, MatcherType};

/// A translated query: a WHERE clause over `samples` and its bound
/// parameters, in placeholder order.
#[derive(Debug, Clone)]
pub struct SamplePredicate {
    /// The WHERE clause body (without the `WHERE` keyword).
    pub where_clause: String,
    /// Bound values, one per `?` placeholder, in placeholder order:
    /// one value per matcher, then range start, then range end.
    pub params: Vec<Value>,
}

/// Translates a query into a [`SamplePredicate`].
///
/// Matchers are processed in request order. The reserved `__name__` label
/// compares the dedicated `name` column; every other label compares the
/// corresponding key of the `dimensions` JSON document. Two mandatory
/// fragments close the clause: `timestamp BETWEEN ? AND ?` (inclusive on
/// both ends) and `value IS NOT NULL`. A query with zero matchers is legal
/// and yields only the mandatory fragments.
///
/// # Errors
///
/// Returns [`TranslateError::UnsupportedMatcher`] for an unknown matcher
/// enum value and [`TranslateError::InvalidLabelName`] for a label name
/// outside `[A-Za-z0-9_]+`.
pub fn translate(query: &proto::Query) -> Result<SamplePredicate, TranslateError> {
    let mut fragments = Vec::with_capacity(query.matchers.len() + 2);
    let mut params = Vec::with_capacity(query.matchers.len() + 2);

    for matcher in &query.matchers {
        let op = comparison_op(matcher.r#type)?;

        if matcher.name == METRIC_NAME_LABEL {
            fragments.push(format!("name {op} ?"));
        } else {
            validate_label_name(&matcher.name)?;
            fragments.push(format!(
                "json_extract(dimensions, '$.{}') {op} ?",
                matcher.name
            ));
        }

        params.push(Value::Text(matcher.value.clone()));
    }

    fragments.push("timestamp BETWEEN ? AND ?".to_string());
    fragments.push("value IS NOT NULL".to_string());
    params.push(Value::Integer(query.start_timestamp_ms));
    params.push(Value::Integer(query.end_timestamp_ms));

    Ok(SamplePredicate {
        where_clause: fragments.join(" AND "),
        params,
    })
}

/// Maps a wire matcher type to its SQL comparison operator.
fn comparison_op(raw: i32) -> Result<&'static str, TranslateError> {
    let matcher_type =
        MatcherType::try_from(raw).map_err(|_| TranslateError::UnsupportedMatcher { raw })?;

    Ok(match matcher_type {
        MatcherType::Eq => "=",
        MatcherType::Neq => "!=",
        MatcherType::Re => "REGEXP",
        MatcherType::Nre => "NOT REGEXP",
    })
}

/// Accepts only names that are safe to splice into a JSON path literal.
fn validate_label_name(name: &str) -> Result<(), TranslateError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TranslateError::InvalidLabelName {
            name: name.to_string(),
        })
    }
}
