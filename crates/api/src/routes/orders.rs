//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use common::ProductId;
use doc_store::DocumentStore;
use domain::{Identity, OrderView, PlaceOrder};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::OptionalJsonBody;
use crate::state::AppState;

/// Header carrying the client's checkout dedupe key.
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PlaceOrderRequest {
    pub address: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order: OrderView,
    /// Cart entries skipped because their product was deleted.
    pub dropped_items: Vec<ProductId>,
    pub replayed: bool,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

// -- Handlers --

/// POST /place_order: turn the caller's cart into an order.
#[tracing::instrument(skip(state, identity, headers, req), fields(user_id = %identity.id))]
pub async fn place<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    OptionalJsonBody(req): OptionalJsonBody<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| ApiError::BadRequest("Idempotency-Key must be ASCII".to_string()))
        })
        .transpose()?;

    let placement = state
        .orders
        .place_order(
            identity.id,
            PlaceOrder {
                address: req.address,
                idempotency_key,
            },
        )
        .await?;

    Ok(Json(PlaceOrderResponse {
        message: "Order placed successfully",
        order: placement.order,
        dropped_items: placement.dropped,
        replayed: placement.replayed,
    }))
}

/// GET /view_orders: the caller's orders.
#[tracing::instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.orders.list_orders(identity.id).await?;
    Ok(Json(OrdersResponse { orders }))
}
