//! Order aggregate and cart-to-order conversion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};
use crate::cart::Cart;
use crate::catalog::Product;
use crate::money::Money;
use crate::repository::Entity;
use crate::schema;

/// One ordered product, with the unit price it was bought at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// Returns the price of the whole line, or `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// An immutable snapshot of a cart at checkout.
///
/// `total` is computed once, when the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub placed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Result of converting a cart into an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub order: Order,
    /// Cart entries whose product no longer exists, in cart order.
    pub dropped: Vec<ProductId>,
}

impl Order {
    /// Snapshots `cart` into a new placed order.
    ///
    /// Entries whose product is missing from `products` are left out of the
    /// order and reported in [`Conversion::dropped`]. Fails with
    /// [`OrderError::TotalOverflow`] when the total cannot be represented.
    pub fn from_cart(
        cart: &Cart,
        products: &HashMap<ProductId, Product>,
        address: Option<String>,
        idempotency_key: Option<String>,
        placed_at: DateTime<Utc>,
    ) -> Result<Conversion, OrderError> {
        let mut items = Vec::with_capacity(cart.items.len());
        let mut dropped = Vec::new();

        for entry in &cart.items {
            match products.get(&entry.product_id) {
                Some(product) => items.push(OrderItem {
                    product_id: entry.product_id,
                    quantity: entry.quantity,
                    price: product.price,
                }),
                None => dropped.push(entry.product_id),
            }
        }

        let subtotals = items
            .iter()
            .map(OrderItem::subtotal)
            .collect::<Option<Vec<Money>>>()
            .ok_or(OrderError::TotalOverflow)?;
        let total = Money::checked_sum(subtotals).ok_or(OrderError::TotalOverflow)?;

        Ok(Conversion {
            order: Order {
                id: OrderId::new(),
                user_id: cart.user_id,
                items,
                total,
                status: OrderStatus::Placed,
                address,
                placed_at,
                idempotency_key,
            },
            dropped,
        })
    }

    /// Returns the ids of every ordered product.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|i| i.product_id).collect()
    }
}

impl Entity for Order {
    type Id = OrderId;
    const COLLECTION: &'static str = schema::ORDERS;

    fn id(&self) -> OrderId {
        self.id
    }
}
