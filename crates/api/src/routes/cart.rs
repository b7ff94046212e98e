//! Cart endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use doc_store::DocumentStore;
use domain::{CartView, Identity, Money};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Option<String>,
    /// A number or a numeric string; anything else counts as 1.
    pub quantity: Option<Value>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub cart: CartView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
}

// -- Handlers --

/// POST /add_to_cart: add or increment a product in the caller's cart.
#[tracing::instrument(skip(state, identity, req), fields(user_id = %identity.id))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
    JsonBody(req): JsonBody<AddToCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let quantity = resolve_quantity(req.quantity.as_ref());
    let cart = state
        .carts
        .add_item(identity.id, req.product_id.as_deref(), quantity)
        .await?;

    Ok(Json(CartResponse {
        message: Some("Product added to cart"),
        cart,
        total_price: None,
    }))
}

/// GET /view_cart: the caller's cart with its total.
#[tracing::instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn view<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.view_cart(identity.id).await?;
    let total_price = cart.total_price;

    Ok(Json(CartResponse {
        message: cart.items.is_empty().then_some("Cart is empty"),
        cart,
        total_price: Some(total_price),
    }))
}

/// Resolves the requested quantity the way clients have always sent it:
/// numbers are truncated to integers, strings are read up to the first
/// non-digit, and anything missing or unreadable means one.
pub fn resolve_quantity(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(1),
        Some(Value::String(s)) => leading_integer(s).unwrap_or(1),
        _ => 1,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Out-of-range values saturate so they are rejected as invalid, not defaulted.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
