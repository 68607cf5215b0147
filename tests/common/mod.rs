#![allow(dead_code)]

use std::{str::FromStr, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use serde_json::Value;
use storefront_api::{
    cache::{MemoryCache, SharedCache},
    config::{JwtConfig, SupplierConfig},
    db::{create_orm_conn, run_migrations},
    entity::products,
    middleware::auth::AuthUser,
    services::{supplier_service::SupplierGateway, token_service::TokenIssuer},
    state::AppState,
};
use tower::ServiceExt;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".into(),
        issuer: "storefront-api".into(),
        audience: "storefront-clients".into(),
    }
}

/// Supplier settings with a short retry delay so retry tests stay fast.
pub fn supplier_config(base_url: &str) -> SupplierConfig {
    SupplierConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
        max_attempts: 3,
        retry_delay: Duration::from_millis(20),
    }
}

pub async fn setup_state() -> anyhow::Result<AppState> {
    setup_state_with(Arc::new(MemoryCache::default()), "http://127.0.0.1:9/").await
}

/// Fresh in-memory database with the full schema applied.
pub async fn setup_state_with(cache: SharedCache, supplier_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:").await?;
    run_migrations(&orm).await?;

    Ok(AppState {
        orm,
        cache,
        tokens: TokenIssuer::new(&jwt_config()),
        supplier: SupplierGateway::new(&supplier_config(supplier_url))?,
    })
}

pub fn price(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

pub async fn insert_product(
    state: &AppState,
    sku: &str,
    unit_price: &str,
) -> anyhow::Result<products::Model> {
    let product = products::ActiveModel {
        id: NotSet,
        sku: Set(sku.to_string()),
        name: Set(format!("Product {sku}")),
        description: Set(Some("test product".into())),
        price: Set(price(unit_price)),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn register_and_identify(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    use storefront_api::{dto::auth::RegisterRequest, services::auth_service::register_user};

    let resp = register_user(
        state,
        RegisterRequest {
            email: email.to_string(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        },
    )
    .await?;
    let user = resp.data.expect("registered user");
    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
    })
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
