//! Cart aggregate implementation.

use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::repository::Entity;
use crate::schema;

/// One product reference and how many of it the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// The single mutable cart of one user.
///
/// Items keep insertion order and hold at most one entry per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: Vec::new(),
        }
    }

    /// Adds `quantity` of a product, merging into an existing entry for the
    /// same product or appending a new one.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                    CartError::InvalidQuantity(i64::from(item.quantity) + i64::from(quantity))
                })?;
            }
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
        Ok(())
    }

    /// Removes every item. The cart itself is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns true if the cart holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the ids of every referenced product.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|i| i.product_id).collect()
    }
}

impl Entity for Cart {
    type Id = CartId;
    const COLLECTION: &'static str = schema::CARTS;

    fn id(&self) -> CartId {
        self.id
    }
}
