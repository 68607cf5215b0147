//! Catalog reads and writes, with the product list served cache-aside.
//!
//! The full product list lives under one fixed cache key for at most
//! [`PRODUCT_LIST_TTL`]. Every successful write through this module deletes
//! that key before returning. Cache failures never fail a request; they are
//! logged and treated as a miss.

use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Unchanged, ColumnTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use validator::Validate;

use crate::{
    cache::CacheStore,
    dto::products::{CreateProductRequest, ProductList, ProductStock, UpdateProductRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const PRODUCT_LIST_CACHE_KEY: &str = "products:all";
pub const PRODUCT_LIST_TTL: Duration = Duration::from_secs(120);

const SKU_TAKEN: &str = "SKU is already used";
const PRODUCT_REFERENCED: &str = "Product is referenced by existing orders";

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    if let Some(items) = read_cached_list(state.cache.as_ref()).await {
        tracing::debug!(count = items.len(), "product list served from cache");
        let meta = Meta::single_page(items.len());
        return Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)));
    }

    let items: Vec<Product> = Products::find()
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    tracing::debug!(count = items.len(), "product list loaded from store");

    write_cached_list(state.cache.as_ref(), &items).await;

    let meta = Meta::single_page(items.len());
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let product = find_product(state, id).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    payload.validate()?;
    let product = ActiveModel {
        id: NotSet,
        sku: Set(payload.sku),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
    }
    .insert(&state.orm)
    .await
    .map_err(map_write_error)?;

    invalidate_cached_list(state.cache.as_ref()).await;
    tracing::info!(product_id = product.id, sku = %product.sku, "product created");

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Replaces every field of the product. A row deleted concurrently yields `NotFound`.
pub async fn update_product(
    state: &AppState,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<()> {
    if payload.id != id {
        return Err(AppError::BadRequest(
            "Product id in the path does not match the body".into(),
        ));
    }
    payload.validate()?;

    ActiveModel {
        id: Unchanged(id),
        sku: Set(payload.sku),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
    }
    .update(&state.orm)
    .await
    .map_err(|err| match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => AppError::NotFound,
        other => map_write_error(other),
    })?;

    invalidate_cached_list(state.cache.as_ref()).await;
    tracing::info!(product_id = id, "product updated");
    Ok(())
}

/// Refuses to delete a product that order lines still reference.
pub async fn delete_product(state: &AppState, id: i32) -> AppResult<()> {
    let txn = state.orm.begin().await?;

    let references = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&txn)
        .await?;
    if references > 0 {
        return Err(AppError::BadRequest(PRODUCT_REFERENCED.into()));
    }

    // the restrict foreign key still guards against a line added concurrently
    let result = Products::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::BadRequest(PRODUCT_REFERENCED.into())
            }
            _ => AppError::from(err),
        })?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit().await?;

    invalidate_cached_list(state.cache.as_ref()).await;
    tracing::info!(product_id = id, "product deleted");
    Ok(())
}

/// Local product merged with live supplier stock. Supplier failures surface as 503.
pub async fn get_product_stock(state: &AppState, id: i32) -> AppResult<ApiResponse<ProductStock>> {
    let product = find_product(state, id).await?;

    let stock = state
        .supplier
        .fetch_stock(&product.sku)
        .await
        .map_err(|err| {
            tracing::error!(product_id = id, sku = %product.sku, error = %err, "supplier lookup failed");
            AppError::ServiceUnavailable
        })?;

    let data = ProductStock {
        product_id: product.id,
        name: product.name,
        description: product.description,
        sku: product.sku,
        store_price: product.price,
        supplier_stock: stock.stock_quantity,
        expected_shipping: stock.expected_shipping,
        supplier: stock.supplier_name,
    };
    Ok(ApiResponse::success("Product stock", data, Some(Meta::empty())))
}

async fn find_product(state: &AppState, id: i32) -> AppResult<Product> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or(AppError::NotFound)
}

fn map_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(SKU_TAKEN.into()),
        _ => AppError::from(err),
    }
}

async fn read_cached_list(cache: &dyn CacheStore) -> Option<Vec<Product>> {
    let raw = match cache.get(PRODUCT_LIST_CACHE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(error = %err, "product cache read failed, falling back to store");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => Some(items),
        Err(err) => {
            tracing::warn!(error = %err, "discarding undecodable product cache entry");
            None
        }
    }
}

async fn write_cached_list(cache: &dyn CacheStore, items: &[Product]) {
    let raw = match serde_json::to_string(items) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode product list for cache");
            return;
        }
    };
    if let Err(err) = cache
        .set(PRODUCT_LIST_CACHE_KEY, raw, PRODUCT_LIST_TTL)
        .await
    {
        tracing::warn!(error = %err, "product cache write failed");
    }
}

async fn invalidate_cached_list(cache: &dyn CacheStore) {
    if let Err(err) = cache.delete(PRODUCT_LIST_CACHE_KEY).await {
        tracing::warn!(error = %err, "product cache invalidation failed");
    }
}
