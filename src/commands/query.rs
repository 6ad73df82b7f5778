use crate::{
    cli::Query,
    error::Error,
    params::QueryParameters,
    server::RangeResponse,
    store::Db,
};

impl Query {
    pub(crate) async fn run(self) -> Result<(), Error> {
        super::init_tracing();

        let path = self.store.db_path()?;
        let db = Db::open(&path, true)
            .await
            .map_err(|e| Error::DatabaseOpenFailed(path.clone(), e))?;

        let params = QueryParameters {
            start: self.alku,
            end: self.loppu,
            limit: self.limitti,
        };

        let response =
            RangeResponse::fetch(&db, &self.store.namespace, params, self.response_shape)
                .await
                .map_err(Error::QueryFailed)?;

        println!(
            "{}",
            serde_json::to_string_pretty(&response).map_err(Error::OutputFailed)?
        );

        db.close().await.map_err(Error::DatabaseCloseFailed)
    }
}
