use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    cache::{DisabledCache, MemoryCache, SharedCache},
    config::AppConfig,
    services::{supplier_service::SupplierGateway, token_service::TokenIssuer},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub cache: SharedCache,
    pub tokens: TokenIssuer,
    pub supplier: SupplierGateway,
}

impl AppState {
    pub fn from_config(config: &AppConfig, orm: DatabaseConnection) -> anyhow::Result<Self> {
        let cache: SharedCache = if config.cache_enabled {
            Arc::new(MemoryCache::default())
        } else {
            tracing::info!("product cache disabled");
            Arc::new(DisabledCache)
        };

        Ok(Self {
            orm,
            cache,
            tokens: TokenIssuer::new(&config.jwt),
            supplier: SupplierGateway::new(&config.supplier)?,
        })
    }
}
