use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::Product;

/// Decimal places a stored price can hold.
pub const PRICE_SCALE: u32 = 2;

/// Largest value the `Decimal(10, 2)` price column accepts.
pub fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, PRICE_SCALE)
}

fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("non_negative").with_message("must not be negative".into()));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(ValidationError::new("price_scale")
            .with_message("must have at most 2 decimal places".into()));
    }
    if *price > max_price() {
        return Err(ValidationError::new("price_range")
            .with_message("must not exceed 99999999.99".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "valid_price"))]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
}

/// Full replacement of a product; `id` must match the path.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "valid_price"))]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Local product data merged with the supplier's live stock.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductStock {
    pub product_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    #[schema(value_type = String, example = "19.99")]
    pub store_price: Decimal,
    pub supplier_stock: i32,
    pub expected_shipping: String,
    pub supplier: String,
}
