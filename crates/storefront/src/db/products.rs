//! Product repository for the `products` table.

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use desicart_core::{Category, Price, Product, ProductId};

use super::RepositoryError;

/// Columns selected for a product, in the order `product_from_row` reads them.
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.title, p.category, p.price, p.original_price, \
     p.rating, p.review_count, p.image, p.is_best_seller, p.delivery_date, p.description, \
     p.bank_offers, p.is_sponsored, p.limited_deal, p.features";

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row cannot be mapped.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p ORDER BY p.id");
        let rows = sqlx::query(&sql).fetch_all(self.pool).await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Insert or update catalog entries by ID.
    ///
    /// Runs in a single transaction so a partial seed never becomes visible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn upsert_all(&self, products: &[Product]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for product in products {
            let review_count = i32::try_from(product.review_count).map_err(|_| {
                RepositoryError::Conflict(format!(
                    "review count out of range for product {}",
                    product.id
                ))
            })?;

            let result = sqlx::query(
                r"
                INSERT INTO products (
                    id, title, category, price, original_price, rating, review_count,
                    image, is_best_seller, delivery_date, description, bank_offers,
                    is_sponsored, limited_deal, features
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    category = EXCLUDED.category,
                    price = EXCLUDED.price,
                    original_price = EXCLUDED.original_price,
                    rating = EXCLUDED.rating,
                    review_count = EXCLUDED.review_count,
                    image = EXCLUDED.image,
                    is_best_seller = EXCLUDED.is_best_seller,
                    delivery_date = EXCLUDED.delivery_date,
                    description = EXCLUDED.description,
                    bank_offers = EXCLUDED.bank_offers,
                    is_sponsored = EXCLUDED.is_sponsored,
                    limited_deal = EXCLUDED.limited_deal,
                    features = EXCLUDED.features
                ",
            )
            .bind(&product.id)
            .bind(&product.title)
            .bind(product.category.as_str())
            .bind(product.price)
            .bind(product.original_price)
            .bind(product.rating)
            .bind(review_count)
            .bind(&product.image)
            .bind(product.is_best_seller)
            .bind(product.delivery_date.as_deref())
            .bind(&product.description)
            .bind(&product.bank_offers)
            .bind(product.is_sponsored)
            .bind(product.limited_deal)
            .bind(&product.features)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

/// Map a row selected with [`PRODUCT_COLUMNS`] into a [`Product`].
pub(crate) fn product_from_row(row: &PgRow) -> Result<Product, RepositoryError> {
    let id: ProductId = row.try_get("id")?;

    let category: String = row.try_get("category")?;
    let category = category.parse::<Category>().map_err(|e| {
        RepositoryError::DataCorruption(format!("product {id}: {e}"))
    })?;

    let review_count: i32 = row.try_get("review_count")?;
    let review_count = u32::try_from(review_count).map_err(|_| {
        RepositoryError::DataCorruption(format!("product {id}: negative review count"))
    })?;

    Ok(Product {
        title: row.try_get("title")?,
        category,
        price: row.try_get::<Price, _>("price")?,
        original_price: row.try_get::<Option<Price>, _>("original_price")?,
        rating: row.try_get::<Decimal, _>("rating")?,
        review_count,
        image: row.try_get("image")?,
        is_best_seller: row.try_get("is_best_seller")?,
        delivery_date: row.try_get("delivery_date")?,
        description: row.try_get("description")?,
        bank_offers: row.try_get("bank_offers")?,
        is_sponsored: row.try_get("is_sponsored")?,
        limited_deal: row.try_get("limited_deal")?,
        features: row.try_get("features")?,
        id,
    })
}
