//! Catalog endpoints used by sellers to list and restock products.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CreateProductRequest, Product, ProductId};
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::ApiError;
use crate::extract::Identity;

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub stock: u32,
}

/// POST /products
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let Json(request) = body?;
    state.validator.product(&request)?;

    let product = state.workflow.create_product(&actor, request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Product created successfully", product),
    ))
}

/// GET /products/{id}: public.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Path(product_id) = id?;
    let product = state.workflow.get_product(product_id).await?;
    Ok(ApiResponse::ok("Product retrieved successfully", product))
}

/// PUT /products/{id}/stock: overwrite the stock counter.
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Path(product_id) = id?;
    let Json(request) = body?;

    let product = state
        .workflow
        .restock(product_id, request.stock, &actor)
        .await?;
    Ok(ApiResponse::ok("Stock updated successfully", product))
}
