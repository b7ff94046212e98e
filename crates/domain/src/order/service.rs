//! Order service: converts carts into orders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use doc_store::{DocumentStore, StoreError};
use serde::Serialize;

use super::{Order, OrderError, OrderStatus};
use crate::cart::Cart;
use crate::catalog::{Product, ProductSummary};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::{Repository, Stored};
use crate::retry::RetryPolicy;

/// Input for [`OrderService::place_order`].
#[derive(Debug, Clone, Default)]
pub struct PlaceOrder {
    /// Optional delivery address.
    pub address: Option<String>,

    /// Client-chosen key; repeating it returns the order it first created.
    pub idempotency_key: Option<String>,
}

/// An order line with its product resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product: Option<ProductSummary>,
    pub quantity: u32,
    pub price: Money,
}

/// An order as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub placed_at: DateTime<Utc>,
}

impl OrderView {
    /// Resolves every line against `products`. The stored total is kept as is.
    pub fn resolve(order: Order, products: &HashMap<ProductId, Product>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items: order
                .items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id,
                    product: products.get(&item.product_id).map(Product::summary),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            total: order.total,
            status: order.status,
            address: order.address,
            placed_at: order.placed_at,
        }
    }
}

/// Outcome of [`OrderService::place_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub order: OrderView,

    /// Cart entries left out because their product no longer exists.
    pub dropped: Vec<ProductId>,

    /// True when an earlier order with the same idempotency key was returned.
    pub replayed: bool,
}

/// Service owning the order collection.
///
/// Placing an order writes the new order and the emptied cart in one atomic
/// batch guarded by the cart's version, so a crash or a concurrent cart
/// change can never leave an order next to an uncleared cart.
pub struct OrderService<S: DocumentStore + Clone> {
    orders: Repository<S, Order>,
    carts: Repository<S, Cart>,
    products: Repository<S, Product>,
    retry: RetryPolicy,
}

impl<S: DocumentStore + Clone> OrderService<S> {
    /// Creates a new order service with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Creates a new order service with an explicit retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            carts: Repository::new(store.clone()),
            products: Repository::new(store),
            retry,
        }
    }

    /// Converts the user's cart into a placed order and empties the cart.
    #[tracing::instrument(skip(self, input), fields(idempotency_key = ?input.idempotency_key))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        input: PlaceOrder,
    ) -> Result<Placement, DomainError> {
        let input = PlaceOrder {
            address: non_blank(input.address),
            idempotency_key: non_blank(input.idempotency_key),
        };

        let placement = self
            .retry
            .run(|| {
                let input = input.clone();
                async move { self.attempt_place(user_id, input).await }
            })
            .await?;

        if placement.replayed {
            tracing::info!(order_id = %placement.order.id, "idempotent replay of earlier order");
        } else {
            metrics::counter!("orders_placed_total").increment(1);
            metrics::histogram!("order_total_amount").record(placement.order.total.as_major());
            if !placement.dropped.is_empty() {
                tracing::warn!(dropped = ?placement.dropped, "cart items without a product were skipped");
            }
            tracing::info!(order_id = %placement.order.id, total = %placement.order.total, "order placed");
        }

        Ok(placement)
    }

    /// Lists the user's orders in placement order, with products resolved.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderView>, DomainError> {
        let orders: Vec<Order> = self
            .orders
            .find(self.orders.query().filter("userId", user_id.to_string()))
            .await?
            .into_iter()
            .map(|s| s.entity)
            .collect();

        let mut ids: Vec<ProductId> = orders.iter().flat_map(Order::product_ids).collect();
        ids.sort_unstable_by_key(|id| id.as_uuid());
        ids.dedup();
        let products = self.products.get_many(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderView::resolve(order, &products))
            .collect())
    }

    async fn attempt_place(
        &self,
        user_id: UserId,
        input: PlaceOrder,
    ) -> Result<Placement, DomainError> {
        if let Some(key) = &input.idempotency_key
            && let Some(existing) = self.find_by_key(user_id, key).await?
        {
            return self.replay(existing.entity).await;
        }

        let Some(Stored {
            entity: cart,
            version,
        }) = self
            .carts
            .find_one(self.carts.query().filter("userId", user_id.to_string()))
            .await?
            .filter(|stored| !stored.entity.is_empty())
        else {
            // A same-key request may have emptied the cart since the lookup above.
            if let Some(key) = &input.idempotency_key
                && let Some(existing) = self.find_by_key(user_id, key).await?
            {
                return self.replay(existing.entity).await;
            }
            return Err(OrderError::EmptyCart.into());
        };

        let products = self.products.get_many(&cart.product_ids()).await?;
        let conversion = Order::from_cart(
            &cart,
            &products,
            input.address,
            input.idempotency_key.clone(),
            Utc::now(),
        )?;

        let mut cleared = cart;
        cleared.clear();
        let batch = vec![
            self.orders.insert_op(&conversion.order)?,
            self.carts.update_op(&cleared, version)?,
        ];

        match self.orders.store().commit(batch).await {
            Ok(_) => Ok(Placement {
                order: OrderView::resolve(conversion.order, &products),
                dropped: conversion.dropped,
                replayed: false,
            }),
            // Another request with the same key committed first.
            Err(err @ StoreError::DuplicateKey { .. }) => match &input.idempotency_key {
                Some(key) => match self.find_by_key(user_id, key).await? {
                    Some(existing) => self.replay(existing.entity).await,
                    None => Err(err.into()),
                },
                None => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Stored<Order>>, DomainError> {
        self.orders
            .find_one(
                self.orders
                    .query()
                    .filter("userId", user_id.to_string())
                    .filter("idempotencyKey", key),
            )
            .await
    }

    async fn replay(&self, order: Order) -> Result<Placement, DomainError> {
        let products = self.products.get_many(&order.product_ids()).await?;
        Ok(Placement {
            order: OrderView::resolve(order, &products),
            dropped: Vec::new(),
            replayed: true,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
