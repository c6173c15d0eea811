//! Cart item repository for the `cart_items` table.
//!
//! Every operation runs in a transaction that first sets
//! `app.current_user_id`, so the row-level security policy on `cart_items`
//! scopes the statement to the caller's rows when the pool connects as an
//! application role.

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use desicart_core::{CartLine, ProductId, UserIdentity};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, product_from_row};

/// Repository for cart item database operations.
pub struct CartItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartItemRepository<'a> {
    /// Create a new cart item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Begin a transaction scoped to `user` for row-level security.
    async fn begin_for(
        &self,
        user: &UserIdentity,
    ) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('app.current_user_id', $1, true)")
            .bind(user)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// List a user's cart lines joined with their products, oldest first.
    ///
    /// Lines whose product row no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row cannot be mapped.
    #[instrument(skip_all, fields(user_id = %user))]
    pub async fn list_for_user(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let mut tx = self.begin_for(user).await?;
        let lines = Self::list_in(&mut tx, user).await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn list_in(
        tx: &mut Transaction<'static, Postgres>,
        user: &UserIdentity,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            r"
            SELECT c.product_id AS line_product_id, c.quantity, {PRODUCT_COLUMNS}
            FROM cart_items c
            LEFT JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at, c.id
            "
        );
        let rows = sqlx::query(&sql).bind(user).fetch_all(&mut **tx).await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            // LEFT JOIN leaves the product columns NULL for a dangling reference
            if row.try_get::<Option<ProductId>, _>("id")?.is_none() {
                let product_id: ProductId = row.try_get("line_product_id")?;
                debug!(%product_id, "Skipping cart line with missing product");
                continue;
            }

            let quantity: i32 = row.try_get("quantity")?;
            let quantity = u32::try_from(quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("non-positive quantity {quantity}"))
            })?;

            lines.push(CartLine {
                product: product_from_row(row)?,
                quantity,
            });
        }

        Ok(lines)
    }

    /// Add one unit of a product, creating the line if needed.
    ///
    /// A single upsert, so concurrent calls for the same line each add
    /// exactly one unit. Returns the user's cart after the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the catalog.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip_all, fields(user_id = %user, product_id = %product_id))]
    pub async fn increment(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let mut tx = self.begin_for(user).await?;

        let quantity: i32 = sqlx::query_scalar(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + 1
            RETURNING quantity
            ",
        )
        .bind(user)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound(format!("product {product_id}"));
            }
            RepositoryError::Database(e)
        })?;
        debug!(quantity, "Cart line incremented");

        let lines = Self::list_in(&mut tx, user).await?;
        tx.commit().await?;
        Ok(lines)
    }

    /// Set the absolute quantity of a line, deleting it when `quantity <= 0`.
    ///
    /// Updating a line that does not exist changes nothing. Returns the
    /// user's cart after the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    #[instrument(skip_all, fields(user_id = %user, product_id = %product_id, quantity))]
    pub async fn set_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let mut tx = self.begin_for(user).await?;

        let affected = if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user)
                .bind(product_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
            sqlx::query(
                "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
            )
            .bind(user)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };
        debug!(affected, "Cart line quantity written");

        let lines = Self::list_in(&mut tx, user).await?;
        tx.commit().await?;
        Ok(lines)
    }
}
