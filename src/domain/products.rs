//! Product entity and the input shapes accepted for creating and patching it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// Store-assigned product identifier.
pub type ProductId = i64;

/// Largest stock level the store column can hold.
pub const MAX_STOCK: u32 = i32::MAX as u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Unvalidated creation input as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Creation input that passed validation; `id` and timestamps are left to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Unvalidated partial update. `None` means "leave the stored value alone".
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductDraft {
    pub fn validate(self) -> Result<NewProduct, DomainError> {
        let ProductDraft {
            name,
            description,
            price,
            stock,
            category,
            image_url,
        } = self;

        Ok(NewProduct {
            name: validate_name(&name)?,
            description: description.trim().to_string(),
            price: validate_price(price)?,
            stock: validate_stock(stock)?,
            category: normalize_optional(category),
            image_url: normalize_optional(image_url),
        })
    }
}

impl ProductPatch {
    /// Blank `category`/`image_url` values are treated as absent and leave the field unchanged.
    pub fn validate(self) -> Result<ProductChanges, DomainError> {
        let ProductPatch {
            name,
            description,
            price,
            stock,
            category,
            image_url,
        } = self;

        Ok(ProductChanges {
            name: name.as_deref().map(validate_name).transpose()?,
            description: description.map(|value| value.trim().to_string()),
            price: price.map(validate_price).transpose()?,
            stock: stock.map(validate_stock).transpose()?,
            category: normalize_optional(category),
            image_url: normalize_optional(image_url),
        })
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<f64, DomainError> {
    if !price.is_finite() {
        return Err(DomainError::validation("price", "must be a finite number"));
    }
    if price < 0.0 {
        return Err(DomainError::validation("price", "must not be negative"));
    }
    Ok(price)
}

fn validate_stock(stock: i64) -> Result<u32, DomainError> {
    if stock < 0 {
        return Err(DomainError::validation("stock", "must not be negative"));
    }
    u32::try_from(stock)
        .ok()
        .filter(|value| *value <= MAX_STOCK)
        .ok_or_else(|| DomainError::validation("stock", format!("must not exceed {MAX_STOCK}")))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
