use crate::prelude::*;
use fieldx::fxstruct;
use moka::future::Cache;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;
use sea_orm::DbErr;
use sea_orm::Statement;
use sea_orm::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

// Identifier quoting differs per backend; MySQL is the odd one out with
// backticks, everything else takes the standard double quotes.
fn quoted(backend: DbBackend, ident: &str) -> String {
    match backend {
        DbBackend::MySql => format!("`{ident}`"),
        _ => format!("\"{ident}\""),
    }
}

fn placeholder(backend: DbBackend, position: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${position}"),
        _ => "?".to_string(),
    }
}

/// The cache-aside store for one table.
///
/// Owns a concurrent key-to-record map and the table metadata needed to populate
/// it on demand: single keys, key batches, the full table, or an arbitrary
/// query of the same row shape. Reads hit the map first and fall through to
/// the backing store only on a miss. Entries leave the map by explicit
/// [`delete()`](TableCache::delete) alone; there is no eviction, no expiry
/// and no single-flight coordination between concurrent misses.
///
/// ```ignore
/// let cache = TableCache::builder()
///     .db(db)
///     .table("customers")
///     .columns(vec!["id".into(), "email".into(), "company".into()])
///     .key_column("id")
///     .decoder(Arc::new(|row: &QueryResult| {
///         Ok(Customer {
///             id:      row.try_get("", "id")?,
///             email:   row.try_get("", "email")?,
///             company: row.try_get("", "company")?,
///         })
///     }) as DecodeFn<Customer>)
///     .build()?;
///
/// cache.load_all().await?;
/// let customer = cache.from_key(42).await?;
/// ```
#[fxstruct(sync, no_new, default(off), builder)]
pub struct TableCache<R>
where
    R: Record,
{
    // Arc, not a bare connection: with sea-orm's `mock` feature on (as the
    // test tooling has it) `DatabaseConnection` is not `Clone`.
    #[fieldx(get(clone), builder(required, into))]
    db: Arc<DatabaseConnection>,

    #[fieldx(get, builder(required, into))]
    table: String,

    /// Ordered column list of the select clause.
    #[fieldx(get, builder(required))]
    columns: Vec<String>,

    #[fieldx(get, builder(required, into))]
    key_column: String,

    #[fieldx(get(clone), builder(required))]
    decoder: DecodeFn<R>,

    /// Whether records of this table are fixed once created. Stored for
    /// external collaborators; the cache itself does not enforce it.
    #[fieldx(get(copy), default(false))]
    immutable: bool,

    /// Whether records of this table may be edited by users. Passive
    /// metadata, same as `immutable`.
    #[fieldx(get(copy), default(false))]
    editable: bool,

    #[fieldx(private, lazy, get(clone), builder(off))]
    column_clause: String,

    #[fieldx(private, lazy, get(clone), builder(off))]
    map: Arc<Cache<R::Key, R>>,
}

impl<R> TableCache<R>
where
    R: Record,
{
    fn build_column_clause(&self) -> String {
        let backend = self.db().get_database_backend();
        self.columns()
            .iter()
            .map(|c| quoted(backend, c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn build_map(&self) -> Arc<Cache<R::Key, R>> {
        Arc::new(Cache::builder().name(self.table()).build())
    }

    /// Retrieve the record for a single lookup identifier.
    ///
    /// A cached identifier is answered from the map with no backend access.
    /// Otherwise a single-row query is issued and the decoded record is
    /// cached **under the lookup identifier**, not under the record's own
    /// key, unlike the bulk loaders. The asymmetry is kept on purpose: an
    /// alias identifier stays resolvable through the map once warmed.
    ///
    /// A missing row is reported as [`CacheError::Query`] wrapping
    /// [`DbErr::RecordNotFound`]; callers get no distinct "not found" signal.
    #[instrument(level = "trace", skip(self))]
    pub async fn from_key(&self, id: R::Key) -> Result<R, CacheError> {
        if let Some(record) = self.map().get(&id).await {
            log::debug!("[{}] FROM_KEY({id}): cache hit", self.table());
            return Ok(record);
        }

        let db = self.db();
        let backend = db.get_database_backend();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.column_clause(),
            quoted(backend, self.table()),
            quoted(backend, self.key_column()),
            placeholder(backend, 1),
        );

        let row = db
            .query_one(Statement::from_sql_and_values(backend, sql, [id.clone().into()]))
            .await
            .map_err(CacheError::Query)?
            .ok_or_else(|| {
                CacheError::Query(DbErr::RecordNotFound(format!(
                    "{}: no row with {} = '{id}'",
                    self.table(),
                    self.key_column()
                )))
            })?;

        let record = (self.decoder())(&row).map_err(CacheError::Decode)?;
        self.map().insert(id, record.clone()).await;

        Ok(record)
    }

    /// Retrieve records for a batch of lookup identifiers.
    ///
    /// Identifiers already cached are collected directly; the rest go into
    /// exactly one `IN`-clause query, with one placeholder per missing
    /// identifier. The query-and-decode pass runs at most once per call;
    /// identifiers it still fails to resolve (absent rows, or rows whose
    /// decoded key differs from the identifier) are silently missing from the
    /// result. Check for the keys you expect.
    ///
    /// An empty identifier slice returns an empty result without touching
    /// the backend.
    #[instrument(level = "trace", skip(self))]
    pub async fn from_keys(&self, ids: &[R::Key]) -> BatchFetch<R> {
        let mut records = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            if let Some(record) = self.map().get(id).await {
                records.insert(record.key(), record);
            }
            else {
                missing.push(id.clone());
            }
        }

        let mut error = None;

        if !missing.is_empty() {
            log::debug!(
                "[{}] FROM_KEYS: {} of {} missing",
                self.table(),
                missing.len(),
                ids.len()
            );

            let backend = self.db().get_database_backend();
            let placeholders = (1..=missing.len())
                .map(|position| placeholder(backend, position))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {} FROM {} WHERE {} IN ({placeholders})",
                self.column_clause(),
                quoted(backend, self.table()),
                quoted(backend, self.key_column()),
            );

            error = self
                .from_query(&sql, missing.iter().cloned().map(Into::into).collect())
                .await
                .err();

            // Single enrichment pass: re-consult the map by the original
            // lookup identifiers and pick up whatever the query resolved.
            for id in &missing {
                if let Some(record) = self.map().get(id).await {
                    records.insert(record.key(), record);
                }
            }
        }

        BatchFetch { records, error }
    }

    /// Load every row of the configured table into the cache.
    #[instrument(level = "trace", skip(self))]
    pub async fn load_all(&self) -> Result<(), CacheError> {
        let backend = self.db().get_database_backend();
        let sql = format!(
            "SELECT {} FROM {}",
            self.column_clause(),
            quoted(backend, self.table()),
        );
        self.from_query(&sql, Vec::new()).await
    }

    /// Load the result of an arbitrary parameterized query into the cache.
    ///
    /// The query must produce the configured column shape. Every decoded
    /// record is cached under its own key, overwriting any previous entry for
    /// that key. A row the decoder rejects is dropped without stopping the
    /// remaining rows; only the first decode failure is returned. A query
    /// execution failure aborts before any row is processed.
    #[instrument(level = "trace", skip(self))]
    pub async fn from_query(&self, sql: &str, params: Vec<Value>) -> Result<(), CacheError> {
        let db = self.db();
        let backend = db.get_database_backend();
        let rows = db
            .query_all(Statement::from_sql_and_values(backend, sql, params))
            .await
            .map_err(|e| {
                log::error!("[{}] FROM_QUERY failed: {e}", self.table());
                CacheError::Query(e)
            })?;

        let decode = self.decoder();
        let map = self.map();
        let mut first_decode_err = None;

        for row in &rows {
            match decode(row) {
                Ok(record) => {
                    map.insert(record.key(), record).await;
                }
                Err(e) => {
                    log::warn!(
                        "[{}] FROM_QUERY: dropping row that failed to decode: {e}",
                        self.table()
                    );
                    if first_decode_err.is_none() {
                        first_decode_err = Some(CacheError::Decode(e));
                    }
                }
            }
        }

        match first_decode_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Walk the cached entries synchronously.
    ///
    /// The predicate returns `false` to stop the walk. The traversal is not a
    /// snapshot: entries added or removed concurrently may or may not be
    /// observed.
    pub fn iterate<F>(&self, mut f: F)
    where
        F: FnMut(&R::Key, &R) -> bool,
    {
        let map = self.map();
        for (key, record) in map.iter() {
            if !f(key.as_ref(), &record) {
                break;
            }
        }
    }

    /// Dispatch one detached task per cached entry.
    ///
    /// Fire-and-forget: no ordering, no completion barrier, and nothing of
    /// the closure's outcome is propagated. The call returns as soon as all
    /// tasks are spawned, which is not when they finish. Requires a Tokio
    /// runtime context.
    pub fn iterate_concurrent<F, Fut>(&self, f: F)
    where
        F: Fn(R::Key, R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let f = Arc::new(f);
        let map = self.map();
        for (key, record) in map.iter() {
            let f = Arc::clone(&f);
            let key = (*key).clone();
            tokio::spawn(async move { f(key, record).await });
        }
    }

    /// Remove one key from the in-memory map.
    ///
    /// The backing store is never touched; the next
    /// [`from_key()`](TableCache::from_key) for this key re-queries it.
    pub async fn delete(&self, key: &R::Key) {
        log::debug!("[{}] DELETE({key})", self.table());
        self.map().invalidate(key).await;
    }
}
