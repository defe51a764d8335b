use crate::traits::Record;
use sea_orm::DbErr;
use sea_orm::QueryResult;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// The pluggable decoder slot: one row cursor in, one record (or a decode
/// failure) out.
///
/// The decoder must not retain the [`QueryResult`] past its invocation; the
/// cursor belongs to the load operation that fetched it.
pub type DecodeFn<R> = Arc<dyn Fn(&QueryResult) -> Result<R, DbErr> + Send + Sync>;

/// What a load operation can fail with.
///
/// A missing row on single-key retrieval is not distinguished from other
/// backend failures; it surfaces as [`CacheError::Query`] wrapping
/// [`DbErr::RecordNotFound`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed to execute the query. The operation aborted
    /// without touching the cache.
    #[error("query execution failed: {0}")]
    Query(#[source] DbErr),

    /// The decoder rejected a row. Bulk loads keep processing the remaining
    /// rows and report only the first such failure.
    #[error("row decode failed: {0}")]
    Decode(#[source] DbErr),
}

/// Outcome of a batch retrieval: every record that could be resolved, indexed
/// by the record's own key, plus at most one error from the single
/// query-and-decode pass.
///
/// An identifier that resolved to nothing is simply absent from `records`;
/// callers must check for the keys they expect. `error == None` does not
/// imply completeness.
#[derive(Debug)]
pub struct BatchFetch<R>
where
    R: Record,
{
    pub records: HashMap<R::Key, R>,
    pub error: Option<CacheError>,
}

impl<R> BatchFetch<R>
where
    R: Record,
{
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> HashMap<R::Key, R> {
        self.records
    }
}
