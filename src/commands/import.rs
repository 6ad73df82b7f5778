use chrono::Utc;
use serde_json::Value;
use serde_jsonlines::JsonLinesReader;
use tokio::fs;
use tracing::info;

use crate::{cli::Import, error::Error, store::Db};

impl Import {
    pub(crate) async fn run(self) -> Result<(), Error> {
        super::init_tracing();

        let data = fs::read(&self.file)
            .await
            .map_err(|e| Error::ImportFileUnreadable(self.file.clone(), e))?;

        let mut documents = JsonLinesReader::new(&data[..])
            .read_all::<Value>()
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| Error::ImportFileInvalid(self.file.clone(), e))?;

        if self.stamp {
            // Fractional Unix seconds, matching what the sensor client records.
            let now = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
            let mut stamped = 0;
            for document in &mut documents {
                if let Value::Object(body) = document {
                    if !body.contains_key("timestamp") {
                        body.insert("timestamp".into(), now.into());
                        stamped += 1;
                    }
                }
            }
            info!("Stamped {stamped} documents with timestamp {now}");
        }

        let path = self.store.db_path()?;
        let db = Db::open(&path, false)
            .await
            .map_err(|e| Error::DatabaseOpenFailed(path.clone(), e))?;

        let imported = db
            .insert(&self.store.namespace, documents)
            .await
            .map_err(Error::ImportRejected)?;

        println!(
            "Imported {imported} documents into {}",
            self.store.namespace
        );

        db.close().await.map_err(Error::DatabaseCloseFailed)
    }
}
