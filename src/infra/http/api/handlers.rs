use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::application::products::{CreateProductCommand, DeleteOutcome, UpdateProductCommand};

use super::error::ApiError;
use super::models::{ProductCreateRequest, ProductUpdateRequest};
use super::state::ApiState;

pub const PRODUCT_DELETED: &str = "Product deleted";

pub async fn create_product(
    State(state): State<ApiState>,
    payload: Result<Json<ProductCreateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(rejection_to_api)?;
    let command = CreateProductCommand {
        city: payload.city,
        country: payload.country,
    };
    let product = state.products.create_product(command).await?;
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

pub async fn get_product(
    State(state): State<ApiState>,
    Path(city): Path<String>,
) -> Result<Response, ApiError> {
    debug!(%city, "Fetching product with populating read");
    match state.products.get_product(&city).await? {
        Some(product) => Ok(Json(product).into_response()),
        None => Ok(state.not_found.respond()),
    }
}

pub async fn get_product_read_only(
    State(state): State<ApiState>,
    Path(city): Path<String>,
) -> Result<Response, ApiError> {
    debug!(%city, "Fetching product with read-only read");
    match state.products.get_product_read_only(&city).await? {
        Some(product) => Ok(Json(product).into_response()),
        None => Ok(state.not_found.respond()),
    }
}

pub async fn update_product(
    State(state): State<ApiState>,
    Path(city): Path<String>,
    payload: Result<Json<ProductUpdateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(rejection_to_api)?;
    let command = UpdateProductCommand {
        city: payload.city,
        country: payload.country,
    };
    match state.products.update_product(&city, command).await? {
        Some(product) => Ok(Json(product).into_response()),
        None => Ok(state.not_found.respond()),
    }
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Path(city): Path<String>,
) -> Result<Response, ApiError> {
    match state.products.delete_product(&city).await? {
        DeleteOutcome::Deleted { .. } => Ok((StatusCode::OK, PRODUCT_DELETED).into_response()),
        DeleteOutcome::NotFound => Ok(state.not_found.respond()),
    }
}

fn rejection_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("invalid product body", Some(rejection.body_text()))
}
