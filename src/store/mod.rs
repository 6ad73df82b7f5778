use std::{fmt, str::FromStr, time::Duration};

mod db;
pub(crate) use db::Db;

pub(crate) const DEFAULT_NAMESPACE: &str = "ilto.data";

/// A `<database>.<collection>` pair naming a document collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    pub(crate) fn database(&self) -> &str {
        &self.database
    }
}

impl FromStr for Namespace {
    type Err = InvalidNamespace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                Ok(Self {
                    database: database.into(),
                    collection: collection.into(),
                })
            }
            _ => Err(InvalidNamespace(s.into())),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[derive(Debug)]
pub(crate) struct InvalidNamespace(String);

impl fmt::Display for InvalidNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid namespace {:?}; expected <database>.<collection>",
            self.0
        )
    }
}

impl std::error::Error for InvalidNamespace {}

/// An upper bound on the number of documents a query returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Limit {
    Unbounded,
    AtMost(u64),
}

impl Limit {
    /// Interprets a requested limit the way document-store drivers do: `0` means no
    /// limit, and a negative limit bounds the results by its magnitude.
    pub(crate) fn from_request(limit: i64) -> Self {
        match limit {
            0 => Limit::Unbounded,
            n => Limit::AtMost(n.unsigned_abs()),
        }
    }

    /// SQLite treats a negative `LIMIT` as unbounded.
    fn as_sql(self) -> i64 {
        match self {
            Limit::Unbounded => -1,
            Limit::AtMost(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

/// Documents whose `timestamp` lies in `[start, end]`, newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RangeQuery {
    pub(crate) start: i64,
    pub(crate) end: i64,
    pub(crate) limit: Limit,
}

pub(crate) enum StoreError {
    Closed,
    TimedOut(Duration),
    InvalidDocument { index: usize, reason: &'static str },
    Sqlite(async_sqlite::Error),
}

impl StoreError {
    /// A stable identifier for this class of failure.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            StoreError::Closed => "database_unavailable",
            StoreError::TimedOut(_) => "database_timeout",
            StoreError::InvalidDocument { .. } => "invalid_document",
            StoreError::Sqlite(_) => "database_error",
        }
    }
}

impl From<async_sqlite::Error> for StoreError {
    fn from(e: async_sqlite::Error) -> Self {
        match e {
            async_sqlite::Error::Closed => StoreError::Closed,
            e => StoreError::Sqlite(e),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Closed => write!(f, "connection to the document store is closed"),
            StoreError::TimedOut(timeout) => {
                write!(f, "query did not complete within {}s", timeout.as_secs_f64())
            }
            StoreError::InvalidDocument { index, reason } => {
                write!(f, "document {index} is invalid: {reason}")
            }
            StoreError::Sqlite(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self, self.kind())
    }
}
