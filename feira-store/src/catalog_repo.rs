use crate::errors::map_sqlx;
use async_trait::async_trait;
use feira_catalog::{PricingTier, ProductCatalog, ProductSnapshot};
use feira_core::{EngineError, EngineResult};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreProductCatalog {
    pool: PgPool,
}

impl StoreProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    supplier_id: Uuid,
    name: String,
    base_price_cents: i64,
    tier_pricing: serde_json::Value,
    minimum_order_quantity: i64,
    is_active: bool,
}

impl ProductRow {
    fn into_snapshot(self) -> EngineResult<ProductSnapshot> {
        let tier_pricing: Vec<PricingTier> = serde_json::from_value(self.tier_pricing)
            .map_err(|e| EngineError::storage(format!("malformed tier_pricing: {e}")))?;
        Ok(ProductSnapshot {
            id: self.id,
            supplier_id: self.supplier_id,
            name: self.name,
            base_price_cents: self.base_price_cents,
            tier_pricing,
            minimum_order_quantity: self.minimum_order_quantity,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl ProductCatalog for StoreProductCatalog {
    async fn get_product(&self, id: Uuid) -> EngineResult<Option<ProductSnapshot>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, supplier_id, name, base_price_cents, tier_pricing,
                   minimum_order_quantity, is_active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(ProductRow::into_snapshot).transpose()
    }
}
