use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::{debug, error};

use super::{
    envelope::{ApiError, RangeResponse},
    form::FormFields,
    AppState,
};
use crate::params::QueryParameters;

pub(crate) async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;

    Ok(())
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/haedataa", post(range_query))
        // The path existing dashboards post to.
        .route("/haedataa.php", post(range_query))
        .route("/health", get(health))
        .with_state(state)
}

/// Answers a range query posted as a URL-encoded or multipart form.
///
/// A body that is not a form is treated as one with no fields, which the default
/// policy reads as all zeros.
async fn range_query(
    State(state): State<AppState>,
    FormFields(fields): FormFields,
) -> Result<RangeResponse, ApiError> {
    let params = QueryParameters::from_fields(&fields, state.policy).map_err(|e| {
        debug!("Rejected range query: {e}");
        ApiError::InvalidParameter(e)
    })?;

    let response = RangeResponse::fetch(&state.db, &state.namespace, params, state.shape)
        .await
        .map_err(|e| {
            error!("Range query {:?} failed: {e}", params);
            ApiError::Store(e)
        })?;

    debug!(
        alku = params.start,
        loppu = params.end,
        limitti = params.limit,
        "Returning {} records",
        response.len(),
    );

    Ok(response)
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use snapbox::dir::DirRoot;
    use tower::ServiceExt;

    use super::router;
    use crate::{
        params::ParamPolicy,
        server::{AppState, ResponseShape},
        store::{Db, Namespace, DEFAULT_NAMESPACE},
    };

    async fn app(dir: &DirRoot, policy: ParamPolicy, shape: ResponseShape) -> (Router, Db) {
        let db = Db::open(dir.path().unwrap().join("ilto.sqlite3"), false)
            .await
            .unwrap();
        let namespace: Namespace = DEFAULT_NAMESPACE.parse().unwrap();

        db.insert(
            &namespace,
            [50, 120, 150, 180, 210]
                .into_iter()
                .map(|ts| json!({"timestamp": ts, "ilto/t/1": 20}))
                .collect(),
        )
        .await
        .unwrap();

        let state = AppState {
            db: db.clone(),
            namespace,
            policy,
            shape,
        };

        (router(state), db)
    }

    fn form_post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&body).unwrap())
    }

    fn keys(body: &Value) -> Vec<&str> {
        body.as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    fn record_timestamps(body: &Value) -> Vec<i64> {
        body.as_object()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.parse::<usize>().is_ok())
            .map(|(_, record)| record["timestamp"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn limited_range() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let (status, content_type, body) = call(
            &app,
            form_post("/haedataa.php", "alku=100&loppu=200&limitti=2"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(keys(&body), vec!["alku", "loppu", "limitti", "0", "1"]);
        assert_eq!(body["alku"], 100);
        assert_eq!(body["loppu"], 200);
        assert_eq!(body["limitti"], 2);
        assert_eq!(body["0"], json!({"timestamp": 180, "ilto/t/1": 20}));
        assert_eq!(body["1"], json!({"timestamp": 150, "ilto/t/1": 20}));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn multipart_form() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let body = concat!(
            "--XX\r\n",
            "Content-Disposition: form-data; name=\"alku\"\r\n\r\n",
            "100\r\n",
            "--XX\r\n",
            "Content-Disposition: form-data; name=\"loppu\"\r\n\r\n",
            "200\r\n",
            "--XX\r\n",
            "Content-Disposition: form-data; name=\"limitti\"\r\n\r\n",
            "2\r\n",
            "--XX\r\n",
            "Content-Disposition: form-data; name=\"alku\"; filename=\"alku.txt\"\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "0\r\n",
            "--XX--\r\n",
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/haedataa.php")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
            .body(Body::from(body))
            .unwrap();
        let (status, _, body) = call(&app, request).await;

        // The uploaded file does not override the text field of the same name.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alku"], 100);
        assert_eq!(body["loppu"], 200);
        assert_eq!(body["limitti"], 2);
        assert_eq!(record_timestamps(&body), vec![180, 150]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_limit_is_unlimited() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let (status, _, body) = call(&app, form_post("/haedataa", "alku=100&loppu=200")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limitti"], 0);
        assert_eq!(record_timestamps(&body), vec![180, 150, 120]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_numeric_start_is_zero() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let (status, _, body) =
            call(&app, form_post("/haedataa", "alku=abc&loppu=160&limitti=0")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alku"], 0);
        assert_eq!(record_timestamps(&body), vec![150, 120, 50]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn no_form_reads_as_zeros() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/haedataa")
            .body(Body::from(r#"{"alku": 100}"#))
            .unwrap();
        let (status, _, body) = call(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"alku": 0, "loppu": 0, "limitti": 0}));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_requests_match() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let first = call(&app, form_post("/haedataa", "alku=0&loppu=1000&limitti=3")).await;
        let second = call(&app, form_post("/haedataa", "alku=0&loppu=1000&limitti=3")).await;
        assert_eq!(first, second);
        assert_eq!(record_timestamps(&first.2), vec![210, 180, 150]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn nested_shape() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Nested).await;

        let (status, _, body) =
            call(&app, form_post("/haedataa", "alku=100&loppu=200&limitti=1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(keys(&body), vec!["alku", "loppu", "limitti", "records"]);
        assert_eq!(
            body["records"],
            json!([{"timestamp": 180, "ilto/t/1": 20}])
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn strict_rejects_malformed_input() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Strict, ResponseShape::Flat).await;

        let (status, content_type, body) =
            call(&app, form_post("/haedataa", "alku=abc&loppu=200&limitti=2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body["error"], "invalid_parameter");

        let (status, _, body) =
            call(&app, form_post("/haedataa", "alku=200&loppu=100&limitti=2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_parameter");

        let (status, _, body) =
            call(&app, form_post("/haedataa", "alku=100&loppu=200&limitti=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record_timestamps(&body), vec![180, 150]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_store_is_unavailable() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        db.close().await.unwrap();

        let (status, _, body) =
            call(&app, form_post("/haedataa", "alku=100&loppu=200&limitti=2")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "database_unavailable");
    }

    #[tokio::test]
    async fn other_routes() {
        let dir = DirRoot::mutable_temp().unwrap();
        let (app, db) = app(&dir, ParamPolicy::Permissive, ResponseShape::Flat).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/haedataa")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/does/not/exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        db.close().await.unwrap();
    }
}
