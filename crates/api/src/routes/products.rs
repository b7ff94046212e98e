//! Catalog endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use doc_store::DocumentStore;
use domain::{CatalogError, DomainError, Identity, NewProduct, Product};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::parse_json;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddProductRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct ProductsQuery {
    #[serde(rename = "sellerId")]
    pub seller_id: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

// -- Handlers --

/// POST /add_products: list a product. Sellers only.
///
/// The role is checked before the body is parsed, so a buyer always gets 403.
#[tracing::instrument(skip(state, identity, body), fields(user_id = %identity.id))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    if !identity.is_seller() {
        return Err(DomainError::from(CatalogError::NotSeller).into());
    }
    let req: AddProductRequest = parse_json(&body)?;

    let product = state
        .catalog
        .create_product(
            &identity,
            NewProduct {
                name: req.name,
                price: req.price,
                category: req.category,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product added successfully",
            product,
        }),
    ))
}

/// GET /products?sellerId=: products of one seller.
#[tracing::instrument(skip(state, query))]
pub async fn by_seller<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state
        .catalog
        .products_by_seller(query.seller_id.as_deref())
        .await?;
    Ok(Json(ProductsResponse { products }))
}

/// GET /all_products: every listed product.
#[tracing::instrument(skip(state))]
pub async fn all<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state.catalog.all_products().await?;
    Ok(Json(ProductsResponse { products }))
}
