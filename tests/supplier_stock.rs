mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{Json, Router, extract::Path, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};
use storefront_api::{
    cache::MemoryCache, error::AppError, services::product_service::get_product_stock,
};

/// Starts a fake supplier that fails `failures` times before answering.
async fn spawn_supplier(failures: usize, failure_status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));

    async fn inventory(
        State((calls, failures, status)): State<(Arc<AtomicUsize>, usize, StatusCode)>,
        Path(sku): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        if call < failures {
            return Err(status);
        }
        Ok(Json(json!({
            "sku": sku,
            "stockQuantity": 17,
            "expectedShipping": "2-3 days",
            "supplier": "Acme Wholesale"
        })))
    }

    let app = Router::new()
        .route("/inventory/{sku}", get(inventory))
        .with_state((calls.clone(), failures, failure_status));

    (serve(app).await, calls)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn merges_local_product_with_supplier_stock() -> anyhow::Result<()> {
    let (url, calls) = spawn_supplier(0, StatusCode::INTERNAL_SERVER_ERROR).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let stock = get_product_stock(&state, product.id)
        .await?
        .data
        .expect("stock");
    assert_eq!(stock.sku, "SKU-1");
    assert_eq!(stock.store_price, common::price("12.50"));
    assert_eq!(stock.supplier_stock, 17);
    assert_eq!(stock.expected_shipping, "2-3 days");
    assert_eq!(stock.supplier, "Acme Wholesale");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn retries_transient_failures() -> anyhow::Result<()> {
    let (url, calls) = spawn_supplier(2, StatusCode::SERVICE_UNAVAILABLE).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let stock = get_product_stock(&state, product.id).await?.data.unwrap();
    assert_eq!(stock.supplier_stock, 17);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn gives_up_after_three_attempts() -> anyhow::Result<()> {
    let (url, calls) = spawn_supplier(usize::MAX, StatusCode::INTERNAL_SERVER_ERROR).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let err = get_product_stock(&state, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable));
    assert_eq!(err.to_string(), "Supplier service unavailable");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn client_errors_are_not_retried() -> anyhow::Result<()> {
    let (url, calls) = spawn_supplier(usize::MAX, StatusCode::NOT_FOUND).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let err = get_product_stock(&state, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn unreachable_supplier_is_unavailable() -> anyhow::Result<()> {
    // nothing listens on the discard port
    let state =
        common::setup_state_with(Arc::new(MemoryCache::default()), "http://127.0.0.1:9/").await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let err = get_product_stock(&state, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable));
    Ok(())
}

#[tokio::test]
async fn missing_local_product_is_not_found() -> anyhow::Result<()> {
    let (url, calls) = spawn_supplier(0, StatusCode::INTERNAL_SERVER_ERROR).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;

    let err = get_product_stock(&state, 404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn unreadable_supplier_body_is_not_retried() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/inventory/{sku}",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "sku": "SKU-1", "stockQuantity": "plenty" }))
            }
        }),
    );
    let url = serve(app).await;
    let state = common::setup_state_with(Arc::new(MemoryCache::default()), &url).await?;
    let product = common::insert_product(&state, "SKU-1", "12.50").await?;

    let err = get_product_stock(&state, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}
