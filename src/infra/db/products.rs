use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ProductsRepo, ProductsWriteRepo, RepoError},
    domain::products::{NewProduct, Product, ProductChanges, ProductId},
};

use super::{PostgresRepositories, map_sqlx_error};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, category, image_url, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: f64,
    stock: i32,
    category: Option<String>,
    image_url: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepoError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| RepoError::Integrity {
            message: format!("product {} has negative stock {}", row.id, row.stock),
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock,
            category: row.category,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn stock_column(stock: u32) -> Result<i32, RepoError> {
    i32::try_from(stock).map_err(|_| RepoError::InvalidInput {
        message: format!("stock {stock} exceeds the supported range"),
    })
}

#[async_trait]
impl ProductsRepo for PostgresRepositories {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl ProductsWriteRepo for PostgresRepositories {
    async fn create_product(&self, params: NewProduct) -> Result<Product, RepoError> {
        let sql = format!(
            "INSERT INTO products (name, description, price, stock, category, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&params.name)
            .bind(&params.description)
            .bind(params.price)
            .bind(stock_column(params.stock)?)
            .bind(params.category.as_deref())
            .bind(params.image_url.as_deref())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Product::try_from(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<(), RepoError> {
        let stock = changes.stock.map(stock_column).transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category = COALESCE($6, category),
                image_url = COALESCE($7, image_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price)
        .bind(stock)
        .bind(changes.category.as_deref())
        .bind(changes.image_url.as_deref())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
