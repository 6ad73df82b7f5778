use std::{future::Future, path::Path, time::Duration};

use async_sqlite::{
    rusqlite::{named_params, types::Value as SqlValue, OpenFlags},
    JournalMode, Pool, PoolBuilder,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Namespace, RangeQuery, StoreError};

/// A pool of connections to the document store.
#[derive(Clone)]
pub(crate) struct Db {
    inner: Pool,
    query_timeout: Option<Duration>,
}

impl Db {
    pub(crate) async fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self, StoreError> {
        let inner = PoolBuilder::new()
            .path(path)
            .flags(if read_only {
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            } else {
                OpenFlags::default()
            })
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        if !read_only {
            // Ensure the necessary tables exist.
            inner
                .conn_mut(|conn| {
                    let tx = conn.transaction()?;
                    tx.execute_batch(CREATE_DATABASES)?;
                    tx.commit()
                })
                .await?;
        }

        Ok(Self {
            inner,
            query_timeout: None,
        })
    }

    /// Bounds every range query by `timeout`; `None` waits indefinitely.
    pub(crate) fn with_query_timeout(self, timeout: Option<Duration>) -> Self {
        Self {
            query_timeout: timeout,
            ..self
        }
    }

    pub(crate) async fn close(self) -> Result<(), StoreError> {
        Ok(self.inner.close().await?)
    }

    /// Inserts `documents` into `namespace` in a single transaction.
    ///
    /// Every document must be a JSON object. Its numeric `timestamp` field, if any,
    /// is indexed for range queries; the document itself is stored unmodified.
    pub(crate) async fn insert(
        &self,
        namespace: &Namespace,
        documents: Vec<Value>,
    ) -> Result<usize, StoreError> {
        let rows = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| match document {
                Value::Object(body) => Ok((indexed_timestamp(&body), Value::Object(body))),
                _ => Err(StoreError::InvalidDocument {
                    index,
                    reason: "not a JSON object",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Inserting {} documents into {}", rows.len(), namespace);

        let namespace = namespace.to_string();
        Ok(self
            .inner
            .conn_mut(move |conn| {
                let tx = conn.transaction()?;

                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO documents(namespace, timestamp, body)
                        VALUES(:namespace, :timestamp, :body)",
                    )?;

                    for (timestamp, body) in rows {
                        inserted += stmt.execute(named_params! {
                            ":namespace": namespace,
                            ":timestamp": timestamp,
                            ":body": body,
                        })?;
                    }
                }

                tx.commit()?;
                Ok(inserted)
            })
            .await?)
    }

    /// Returns the documents in `namespace` matching `query`, newest first.
    ///
    /// Documents sharing a timestamp are returned most recently inserted first.
    pub(crate) async fn find_range(
        &self,
        namespace: &Namespace,
        query: RangeQuery,
    ) -> Result<Vec<Value>, StoreError> {
        debug!("Querying {namespace} with {query:?}");

        let namespace = namespace.to_string();
        let read = self.inner.conn(move |conn| {
            conn.prepare_cached(
                "SELECT body
                FROM documents
                WHERE namespace = :namespace
                AND timestamp >= :start
                AND timestamp <= :end
                ORDER BY timestamp DESC, doc_id DESC
                LIMIT :limit",
            )?
            .query_map(
                named_params! {
                    ":namespace": namespace,
                    ":start": query.start,
                    ":end": query.end,
                    ":limit": query.limit.as_sql(),
                },
                |row| row.get::<_, Value>("body"),
            )?
            .collect::<Result<Vec<_>, _>>()
        });

        bounded(self.query_timeout, read).await
    }

    pub(crate) async fn count(&self, namespace: &Namespace) -> Result<u64, StoreError> {
        let namespace = namespace.to_string();
        Ok(self
            .inner
            .conn(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*)
                    FROM documents
                    WHERE namespace = :namespace",
                    named_params! {":namespace": namespace},
                    |row| row.get(0),
                )
            })
            .await?)
    }
}

/// Waits for `query`, failing with [`StoreError::TimedOut`] once `timeout` elapses.
async fn bounded<T, F>(timeout: Option<Duration>, query: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, async_sqlite::Error>>,
{
    match timeout {
        Some(timeout) => Ok(tokio::time::timeout(timeout, query)
            .await
            .map_err(|_| StoreError::TimedOut(timeout))??),
        None => Ok(query.await?),
    }
}

/// The value range queries compare against: the document's `timestamp` if it is a
/// number, or NULL (which never matches a range) otherwise.
fn indexed_timestamp(body: &Map<String, Value>) -> SqlValue {
    match body.get("timestamp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        _ => SqlValue::Null,
    }
}

const CREATE_DATABASES: &str = "
CREATE TABLE IF NOT EXISTS documents (
    doc_id INTEGER PRIMARY KEY,
    namespace TEXT NOT NULL,
    timestamp NUMERIC,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS documents_idx_namespace_timestamp
    ON documents(namespace, timestamp DESC, doc_id DESC);";
