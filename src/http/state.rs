use std::sync::Arc;

use crate::api::ContactApi;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ContactApi>,
}

impl AppState {
    pub fn new(api: Arc<ContactApi>) -> Self {
        Self { api }
    }
}
