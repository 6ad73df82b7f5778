use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    server::ResponseShape,
    store::{Namespace, DEFAULT_NAMESPACE},
};

#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Options {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    Serve(Serve),
    Import(Import),
    Query(Query),
}

/// Where the documents live.
#[derive(Debug, Args)]
pub(crate) struct StoreArgs {
    /// Path to the SQLite document store. Defaults to `<database>.sqlite3` in the
    /// user's data directory.
    #[arg(long, env = "ILTO_DB")]
    pub(crate) db: Option<PathBuf>,

    /// The collection to read from or write to, as `<database>.<collection>`.
    #[arg(long, env = "ILTO_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub(crate) namespace: Namespace,
}

/// Serves range queries over HTTP
#[derive(Debug, Args)]
pub(crate) struct Serve {
    #[command(flatten)]
    pub(crate) store: StoreArgs,

    /// Address to listen on.
    #[arg(long, env = "ILTO_LISTEN", default_value = "127.0.0.1:8080")]
    pub(crate) listen: String,

    /// Seconds to wait for a query before failing it; 0 waits indefinitely.
    #[arg(long, default_value_t = 10)]
    pub(crate) query_timeout: u64,

    /// Reject requests with missing or non-integer fields, an inverted range, or a
    /// negative limit, instead of reading them as zeros.
    #[arg(long)]
    pub(crate) strict: bool,

    /// Layout of matched records in the response.
    #[arg(long, value_enum, default_value_t)]
    pub(crate) response_shape: ResponseShape,
}

/// Imports documents from a JSON Lines file
#[derive(Debug, Args)]
pub(crate) struct Import {
    #[command(flatten)]
    pub(crate) store: StoreArgs,

    /// File with one JSON object per line.
    pub(crate) file: PathBuf,

    /// Set `timestamp` to the current time on documents that lack one.
    #[arg(long)]
    pub(crate) stamp: bool,
}

/// Runs a range query against the store and prints the response
#[derive(Debug, Args)]
pub(crate) struct Query {
    #[command(flatten)]
    pub(crate) store: StoreArgs,

    /// Inclusive lower bound on `timestamp`.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) alku: i64,

    /// Inclusive upper bound on `timestamp`.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) loppu: i64,

    /// Maximum number of records; 0 returns every match.
    #[arg(long, allow_negative_numbers = true, default_value_t = 0)]
    pub(crate) limitti: i64,

    /// Layout of matched records in the response.
    #[arg(long, value_enum, default_value_t)]
    pub(crate) response_shape: ResponseShape,
}
