//! Cart service: add-or-increment and read-with-total.

use std::collections::HashMap;

use common::{CartId, ProductId, UserId};
use doc_store::{DocumentStore, StoreError};
use serde::Serialize;

use super::{Cart, CartError};
use crate::catalog::{Product, ProductSummary};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::{Repository, Stored};
use crate::retry::RetryPolicy;

/// A cart line with its product resolved for display.
///
/// `product` is `None` when the referenced product no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub product: Option<ProductSummary>,
    pub quantity: u32,
}

/// A cart as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    pub items: Vec<CartLine>,
    pub total_price: Money,
}

impl CartView {
    /// The view of a user without a cart.
    pub fn empty() -> Self {
        Self {
            id: None,
            items: Vec::new(),
            total_price: Money::zero(),
        }
    }

    /// Resolves every line against `products`. Missing products price at zero.
    pub fn resolve(
        cart: &Cart,
        products: &HashMap<ProductId, Product>,
    ) -> Result<Self, CartError> {
        let items: Vec<CartLine> = cart
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                product: products.get(&item.product_id).map(Product::summary),
                quantity: item.quantity,
            })
            .collect();

        let subtotals = items
            .iter()
            .filter_map(|line| {
                line.product
                    .as_ref()
                    .map(|p| p.price.checked_mul(line.quantity))
            })
            .collect::<Option<Vec<Money>>>()
            .ok_or(CartError::TotalOverflow)?;
        let total_price = Money::checked_sum(subtotals).ok_or(CartError::TotalOverflow)?;

        Ok(Self {
            id: Some(cart.id),
            items,
            total_price,
        })
    }
}

/// Service owning the cart collection.
///
/// Cart writes are versioned; a lost race is retried from a fresh read
/// according to the configured [`RetryPolicy`].
pub struct CartService<S: DocumentStore + Clone> {
    carts: Repository<S, Cart>,
    products: Repository<S, Product>,
    retry: RetryPolicy,
}

impl<S: DocumentStore + Clone> CartService<S> {
    /// Creates a new cart service with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Creates a new cart service with an explicit retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            products: Repository::new(store),
            retry,
        }
    }

    /// Adds `quantity` of a product to the user's cart, creating the cart on
    /// first use, and returns the updated cart.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: Option<&str>,
        quantity: i64,
    ) -> Result<CartView, DomainError> {
        let raw = product_id
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(CartError::ProductIdRequired)?;
        let product_id =
            ProductId::parse(raw).map_err(|_| CartError::InvalidProductId(raw.to_string()))?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(CartError::InvalidQuantity(quantity))?;

        if self.products.get(product_id).await?.is_none() {
            return Err(CartError::ProductNotFound(product_id).into());
        }

        // The cart is priced before it is written, so a total that cannot be
        // represented never reaches the store.
        let view = self
            .retry
            .run(|| async move {
                let Stored { mut entity, version } = self.load_or_create(user_id).await?;
                entity.add(product_id, quantity)?;
                let view = self.resolve(&entity).await?;
                self.carts.update(entity, version).await?;
                Ok(view)
            })
            .await?;

        metrics::counter!("cart_items_added_total").increment(1);
        tracing::debug!(?view.id, %product_id, quantity, "item added to cart");
        Ok(view)
    }

    /// Returns the user's cart with products resolved and the total price.
    ///
    /// A user without a cart gets an empty view rather than an error.
    #[tracing::instrument(skip(self))]
    pub async fn view_cart(&self, user_id: UserId) -> Result<CartView, DomainError> {
        match self.find_cart(user_id).await? {
            Some(stored) => self.resolve(&stored.entity).await,
            None => Ok(CartView::empty()),
        }
    }

    /// Loads the user's cart, if one was ever created.
    pub async fn find_cart(&self, user_id: UserId) -> Result<Option<Stored<Cart>>, DomainError> {
        self.carts
            .find_one(self.carts.query().filter("userId", user_id.to_string()))
            .await
    }

    async fn load_or_create(&self, user_id: UserId) -> Result<Stored<Cart>, DomainError> {
        if let Some(cart) = self.find_cart(user_id).await? {
            return Ok(cart);
        }

        // The unique index on userId decides between concurrent creators.
        match self.carts.insert(Cart::new(user_id)).await {
            Ok(created) => Ok(created),
            Err(err @ DomainError::Store(StoreError::DuplicateKey { .. })) => {
                self.find_cart(user_id).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn resolve(&self, cart: &Cart) -> Result<CartView, DomainError> {
        let products = self.products.get_many(&cart.product_ids()).await?;
        Ok(CartView::resolve(cart, &products)?)
    }
}
