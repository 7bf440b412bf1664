use crate::api::ApiContext;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiContext,
}
