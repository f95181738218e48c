//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use checkout::{Cancelled, PaymentReceipt, Placed, StatusChanged};
use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    AnalyticsQuery, CreateOrderRequest, DateRange, Order, OrderAnalytics, OrderDetailsUpdate,
    OrderId, OrderStatus, PaymentRequest, UserId,
};
use serde::Deserialize;

use super::{ApiResponse, AppState, PageParams};
use crate::error::ApiError;
use crate::extract::Identity;

type Reply<T> = Result<Json<ApiResponse<T>>, ApiError>;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// `GET /orders/analytics` parameters. Dates are `YYYY-MM-DD`, both inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    pub seller_id: Option<UserId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AnalyticsParams {
    fn to_query(&self) -> Result<AnalyticsQuery, ApiError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::BadRequest(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }

        let start = self.start_date.map(start_of_day).transpose()?;
        let end = self.end_date.map(end_of_day).transpose()?;
        Ok(AnalyticsQuery {
            seller_id: self.seller_id,
            range: DateRange::new(start, end),
        })
    }
}

fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>, ApiError> {
    date.and_hms_opt(0, 0, 0)
        .map(|at| at.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date: {date}")))
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>, ApiError> {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|at| at.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date: {date}")))
}

// -- Handlers --

/// POST /orders: place an order for the caller.
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Placed>>), ApiError> {
    let Json(request) = body?;
    state.validator.create_order(&request)?;

    let placed = state.workflow.create_order(&actor, request).await?;
    if !placed.stock.is_complete() {
        tracing::warn!(
            order_id = %placed.order.id,
            failures = placed.stock.failures().count(),
            "order placed with incomplete stock decrements"
        );
    }

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Order created successfully", placed),
    ))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<OrderId>, PathRejection>,
) -> Reply<Order> {
    let Path(order_id) = id?;
    let order = state.workflow.get_order(order_id, &actor).await?;
    Ok(ApiResponse::ok("Order retrieved successfully", order))
}

/// GET /orders/my: the caller's own orders.
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Reply<Vec<Order>> {
    let Query(params) = params?;
    let orders = state
        .workflow
        .customer_orders(&actor, params.to_page())
        .await?;
    Ok(ApiResponse::ok("Orders retrieved successfully", orders))
}

/// GET /orders/status/{status}
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn by_status(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    status: Result<Path<String>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Reply<Vec<Order>> {
    let Path(status) = status?;
    let Query(params) = params?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let orders = state
        .workflow
        .orders_by_status(status, &actor, params.to_page())
        .await?;
    Ok(ApiResponse::ok("Orders retrieved successfully", orders))
}

/// GET /seller/orders: orders containing the calling seller's lines.
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn seller_orders(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Reply<Vec<Order>> {
    let Query(params) = params?;
    let orders = state
        .workflow
        .seller_orders(&actor, params.to_page())
        .await?;
    Ok(ApiResponse::ok("Orders retrieved successfully", orders))
}

/// GET /admin/orders
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn all_orders(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Reply<Vec<Order>> {
    let Query(params) = params?;
    let orders = state.workflow.all_orders(&actor, params.to_page()).await?;
    Ok(ApiResponse::ok("Orders retrieved successfully", orders))
}

/// PUT /orders/{id}/status
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Reply<StatusChanged> {
    let Path(order_id) = id?;
    let Json(request) = body?;

    let changed = state
        .workflow
        .update_order_status(order_id, request.status, &actor)
        .await?;
    Ok(ApiResponse::ok("Order status updated successfully", changed))
}

/// PUT /orders/{id}: tracking number and internal notes.
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn update_details(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<OrderDetailsUpdate>, JsonRejection>,
) -> Reply<Order> {
    let Path(order_id) = id?;
    let Json(update) = body?;
    state.validator.details(&update)?;

    let order = state
        .workflow
        .update_order_details(order_id, update, &actor)
        .await?;
    Ok(ApiResponse::ok("Order updated successfully", order))
}

/// PUT /orders/{id}/cancel
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<OrderId>, PathRejection>,
) -> Reply<Cancelled> {
    let Path(order_id) = id?;
    let cancelled = state.workflow.cancel_order(order_id, &actor).await?;
    Ok(ApiResponse::ok("Order cancelled successfully", cancelled))
}

/// POST /orders/{id}/payment
#[tracing::instrument(skip(state, body), fields(user_id = %actor.user_id))]
pub async fn pay(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Reply<PaymentReceipt> {
    let Path(order_id) = id?;
    let Json(request) = body?;
    state.validator.payment(&request)?;

    let receipt = state
        .workflow
        .process_payment(order_id, request, &actor)
        .await?;
    Ok(ApiResponse::ok("Payment processed successfully", receipt))
}

/// GET /orders/analytics
#[tracing::instrument(skip(state), fields(user_id = %actor.user_id))]
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Identity(actor): Identity,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Reply<OrderAnalytics> {
    let Query(params) = params?;
    let query = params.to_query()?;

    let analytics = state.workflow.order_analytics(&actor, query).await?;
    Ok(ApiResponse::ok("Analytics retrieved successfully", analytics))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_analytics_dates_cover_whole_days() {
        let params = AnalyticsParams {
            seller_id: None,
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 3, 1)),
        };
        let query = params.to_query().unwrap();
        let start = query.range.start.unwrap();
        let end = query.range.end.unwrap();

        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(end > start);
        assert_eq!(end.date_naive(), date(2024, 3, 1));
    }

    #[test]
    fn test_open_ended_range() {
        let params = AnalyticsParams {
            seller_id: Some(UserId::new(4)),
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.seller_id, Some(UserId::new(4)));
        assert!(query.range.end.is_none());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let params = AnalyticsParams {
            seller_id: None,
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 1, 1)),
        };
        assert!(matches!(params.to_query(), Err(ApiError::BadRequest(_))));
    }
}
