//! Catalog store: seller-owned products.

use std::collections::HashMap;

use common::{ProductId, UserId};
use doc_store::DocumentStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;
use crate::money::Money;
use crate::repository::{Entity, Repository};
use crate::schema;
use crate::user::Identity;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Only sellers may list products.
    #[error("Only sellers can add products")]
    NotSeller,

    /// Name or price was missing.
    #[error("name and price are required")]
    MissingFields,

    /// Price was negative or not a finite number.
    #[error("price must be a non-negative number")]
    InvalidPrice,

    /// The seller filter was missing.
    #[error("sellerId is required")]
    SellerIdRequired,

    /// The seller filter was not a valid id.
    #[error("invalid sellerId: {0}")]
    InvalidSellerId(String),
}

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub seller_id: UserId,
}

impl Product {
    /// Returns the display fields embedded in cart and order lines.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
        }
    }
}

impl Entity for Product {
    type Id = ProductId;
    const COLLECTION: &'static str = schema::PRODUCTS;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Product details shown next to a cart or order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Input for [`CatalogService::create_product`].
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

/// Service owning the product collection.
pub struct CatalogService<S: DocumentStore> {
    products: Repository<S, Product>,
}

impl<S: DocumentStore> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store),
        }
    }

    /// Lists a new product owned by `seller`.
    ///
    /// The role is taken from the verified identity and checked before any
    /// input validation.
    #[tracing::instrument(skip(self, seller, input), fields(seller_id = %seller.id))]
    pub async fn create_product(
        &self,
        seller: &Identity,
        input: NewProduct,
    ) -> Result<Product, DomainError> {
        if !seller.is_seller() {
            return Err(CatalogError::NotSeller.into());
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let (Some(name), Some(price)) = (name, input.price) else {
            return Err(CatalogError::MissingFields.into());
        };
        let price = Money::from_major(price)
            .filter(|p| !p.is_negative())
            .ok_or(CatalogError::InvalidPrice)?;

        let product = Product {
            id: ProductId::new(),
            name,
            price,
            category: input
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            seller_id: seller.id,
        };

        let stored = self.products.insert(product).await?;
        tracing::info!(product_id = %stored.entity.id, "product listed");
        Ok(stored.entity)
    }

    /// Lists every product of one seller, in listing order.
    #[tracing::instrument(skip(self))]
    pub async fn products_by_seller(
        &self,
        seller_id: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        let raw = seller_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(CatalogError::SellerIdRequired)?;
        let seller_id = UserId::parse(raw)
            .map_err(|_| CatalogError::InvalidSellerId(raw.to_string()))?;

        let query = self
            .products
            .query()
            .filter("sellerId", seller_id.to_string());
        Ok(self
            .products
            .find(query)
            .await?
            .into_iter()
            .map(|s| s.entity)
            .collect())
    }

    /// Lists every product, in listing order.
    #[tracing::instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .products
            .find(self.products.query())
            .await?
            .into_iter()
            .map(|s| s.entity)
            .collect())
    }

    /// Loads a product by id.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.get(id).await?.map(|s| s.entity))
    }

    /// Loads the listed products that still exist, keyed by id.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, DomainError> {
        self.products.get_many(ids).await
    }
}
