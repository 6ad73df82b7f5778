use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::{BufMut, BytesMut};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;

use crate::{
    params::{ParamError, QueryParameters, ALKU, LIMITTI, LOPPU},
    store::{Db, Namespace, StoreError},
};

/// How matched records are laid out next to the echoed parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ResponseShape {
    /// Records are siblings of the parameters, keyed `"0"`, `"1"`, ….
    #[default]
    Flat,
    /// Records are an array under `"records"`.
    Nested,
}

/// The answer to a range query: the coerced parameters, followed by the records.
pub(crate) struct RangeResponse {
    params: QueryParameters,
    records: Vec<Value>,
    shape: ResponseShape,
}

impl RangeResponse {
    pub(crate) async fn fetch(
        db: &Db,
        namespace: &Namespace,
        params: QueryParameters,
        shape: ResponseShape,
    ) -> Result<Self, StoreError> {
        let records = db.find_range(namespace, params.range_query()).await?;
        Ok(Self {
            params,
            records,
            shape,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

impl Serialize for RangeResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = match self.shape {
            ResponseShape::Flat => self.records.len(),
            ResponseShape::Nested => 1,
        };

        let mut map = serializer.serialize_map(Some(3 + entries))?;
        map.serialize_entry(ALKU, &self.params.start)?;
        map.serialize_entry(LOPPU, &self.params.end)?;
        map.serialize_entry(LIMITTI, &self.params.limit)?;
        match self.shape {
            ResponseShape::Flat => {
                for (i, record) in self.records.iter().enumerate() {
                    map.serialize_entry(&i.to_string(), record)?;
                }
            }
            ResponseShape::Nested => map.serialize_entry("records", &self.records)?,
        }
        map.end()
    }
}

impl IntoResponse for RangeResponse {
    fn into_response(self) -> Response {
        // Use a small initial capacity of 128 bytes like serde_json::to_vec
        let mut buf = BytesMut::with_capacity(128).writer();
        match serde_json::to_writer(&mut buf, &self) {
            Ok(()) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()),
                )],
                buf.into_inner().freeze(),
            )
                .into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()),
                )],
                err.to_string(),
            )
                .into_response(),
        }
    }
}

pub(crate) enum ApiError {
    InvalidParameter(ParamError),
    Store(StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::InvalidParameter(e) => {
                (StatusCode::BAD_REQUEST, "invalid_parameter", e.to_string())
            }
            ApiError::Store(e) => (
                match e {
                    StoreError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                    StoreError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                },
                e.kind(),
                e.to_string(),
            ),
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}
