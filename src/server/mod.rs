use crate::{
    params::ParamPolicy,
    store::{Db, Namespace},
};

mod api;
pub(crate) use api::serve;

mod envelope;
pub(crate) use envelope::{RangeResponse, ResponseShape};

mod form;

/// Shared by every request; the pool inside `db` is the only shared resource.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) db: Db,
    pub(crate) namespace: Namespace,
    pub(crate) policy: ParamPolicy,
    pub(crate) shape: ResponseShape,
}
