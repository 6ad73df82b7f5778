use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    cli::Serve,
    error::Error,
    params::ParamPolicy,
    server::{self, AppState},
    store::Db,
};

impl Serve {
    pub(crate) async fn run(self) -> Result<(), Error> {
        super::init_tracing();

        // Open the store, initializing it if necessary.
        let path = self.store.db_path()?;
        let query_timeout =
            (self.query_timeout > 0).then(|| Duration::from_secs(self.query_timeout));
        let db_handle = Db::open(&path, false)
            .await
            .map_err(|e| Error::DatabaseOpenFailed(path.clone(), e))?
            .with_query_timeout(query_timeout);

        let documents = db_handle
            .count(&self.store.namespace)
            .await
            .map_err(Error::QueryFailed)?;
        info!(
            "Opened document store at {} ({documents} documents in {})",
            path.display(),
            self.store.namespace,
        );

        let listener = TcpListener::bind(&self.listen)
            .await
            .map_err(|e| Error::ListenFailed(self.listen.clone(), e))?;
        info!("Serving range queries on {}", self.listen);

        let state = AppState {
            db: db_handle.clone(),
            namespace: self.store.namespace,
            policy: if self.strict {
                ParamPolicy::Strict
            } else {
                ParamPolicy::Permissive
            },
            shape: self.response_shape,
        };

        // Spawn the server.
        tokio::spawn(async move {
            if let Err(e) = server::serve(listener, state).await {
                error!("Server exited with an error: {e}")
            }
        });

        // Wait for exit.
        tokio::signal::ctrl_c()
            .await
            .map_err(Error::ShutdownSignalFailed)?;

        info!("Shutting down");
        db_handle.close().await.map_err(Error::DatabaseCloseFailed)
    }
}
