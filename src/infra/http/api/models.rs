use serde::{Deserialize, Serialize};

use crate::domain::products::{ProductDraft, ProductPatch};

#[derive(Debug, Deserialize, Serialize)]
pub struct ProductCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl From<ProductCreateRequest> for ProductDraft {
    fn from(request: ProductCreateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            stock: request.stock,
            category: request.category,
            image_url: request.image_url,
        }
    }
}

/// Partial update body; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProductUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl From<ProductUpdateRequest> for ProductPatch {
    fn from(request: ProductUpdateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            stock: request.stock,
            category: request.category,
            image_url: request.image_url,
        }
    }
}
