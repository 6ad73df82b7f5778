use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use tracing::debug;

/// The decoded fields of a form body, in the order they were sent.
///
/// Both `application/x-www-form-urlencoded` and `multipart/form-data` bodies are
/// read. Uploaded files are skipped. Any other body, or one that fails to decode,
/// yields no fields.
pub(crate) struct FormFields(pub(crate) Vec<(String, String)>);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for FormFields {
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let fields = if is_multipart(&req) {
            match Multipart::from_request(req, state).await {
                Ok(multipart) => multipart_fields(multipart).await,
                Err(e) => {
                    debug!("Ignoring unreadable multipart body: {e}");
                    vec![]
                }
            }
        } else {
            Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map(|Form(fields)| fields)
                .unwrap_or_default()
        };

        Ok(FormFields(fields))
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|ct| ct.type_() == mime::MULTIPART && ct.subtype() == mime::FORM_DATA)
}

/// Collects the text fields of `multipart`, keeping those read before any error.
async fn multipart_fields(mut multipart: Multipart) -> Vec<(String, String)> {
    let mut fields = vec![];

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading multipart body: {e}");
                break;
            }
        };

        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field.text().await {
            Ok(value) => fields.push((name, value)),
            Err(e) => {
                debug!("Stopped reading multipart body: {e}");
                break;
            }
        }
    }

    fields
}
