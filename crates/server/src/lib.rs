//! Reference backend serving the people and tasks collections over the
//! `/api/{resource}/` contract.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use shared::{
    domain::{Entity, EntityId, Person, Task},
    error::{ApiError, ErrorCode},
    protocol::{collection_path, item_route},
};
use storage::{EntityStore, Storage};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

pub mod api;
pub mod app_state;
pub mod config;

use api::{
    create_record, delete_record, fetch_record, list_records, patch_record, replace_record,
    ApiContext, ApiResource,
};
pub use app_state::AppState;

type HttpError = (StatusCode, Json<ApiError>);

pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let router = Router::new().route("/healthz", get(healthz));
    let router = resource_routes::<Person>(router);
    let router = resource_routes::<Task>(router);
    router
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

pub fn new_state(storage: Storage) -> Arc<AppState> {
    Arc::new(AppState {
        api: ApiContext { storage },
    })
}

fn resource_routes<T>(router: Router<Arc<AppState>>) -> Router<Arc<AppState>>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    router
        .route(
            &collection_path(T::RESOURCE),
            get(http_list::<T>).post(http_create::<T>),
        )
        .route(
            &item_route(T::RESOURCE),
            get(http_get::<T>)
                .put(http_replace::<T>)
                .patch(http_patch::<T>)
                .delete(http_delete::<T>),
        )
}

fn status_for(error: &ApiError) -> StatusCode {
    match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: ApiError) -> HttpError {
    (status_for(&error), Json(error))
}

fn parse_body(body: &Bytes) -> Result<Value, HttpError> {
    serde_json::from_slice(body).map_err(|e| {
        reject(ApiError::new(
            ErrorCode::Validation,
            format!("malformed JSON body: {e}"),
        ))
    })
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| reject(ApiError::internal(e.to_string())))?;
    Ok("ok")
}

async fn http_list<T>(State(state): State<Arc<AppState>>) -> Result<Json<Vec<T>>, HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    list_records::<T>(&state.api).await.map(Json).map_err(reject)
}

async fn http_get<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<T>, HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    fetch_record::<T>(&state.api, EntityId(id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_create<T>(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<T>), HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let body = parse_body(&body)?;
    let created = create_record::<T>(&state.api, &body).await.map_err(reject)?;
    info!(resource = T::RESOURCE, id = %created.id(), "record created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn http_replace<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<T>, HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let body = parse_body(&body)?;
    replace_record::<T>(&state.api, EntityId(id), &body)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_patch<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<T>, HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let body = parse_body(&body)?;
    patch_record::<T>(&state.api, EntityId(id), &body)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_delete<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    delete_record::<T>(&state.api, EntityId(id))
        .await
        .map_err(reject)?;
    info!(resource = T::RESOURCE, id, "record deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
