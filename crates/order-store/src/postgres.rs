//! PostgreSQL order store implementation.

use async_trait::async_trait;
use common::{BranchId, CampaignId, ClientId, LineId, OrderId, ProductId, SellerId, UserId};
use domain::{AppliedPromotion, GeoPoint, Money, Order, OrderLine, OrderStatus, StatusHistory};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::notify::channels;
use crate::store::OrderStore;
use crate::{Result, StoreError};

const ORDER_COLUMNS: &str = "id, client_id, seller_id, branch_id, payment_method, delivery_date, \
     origin, subtotal, discount_total, tax_total, grand_total, delivery_lat, delivery_lng, \
     notes, status, reservation_token, created_at, updated_at";

/// PostgreSQL-backed order store.
///
/// Notifications are issued with `pg_notify` inside the writing
/// transaction; Postgres defers NOTIFY delivery until commit, which is
/// exactly the on-commit contract the listener relies on.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let delivery_lat: Option<f64> = row.try_get("delivery_lat")?;
        let delivery_lng: Option<f64> = row.try_get("delivery_lng")?;
        let delivery_point = match (delivery_lat, delivery_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };

        Ok(Order {
            id: OrderId::from_uuid(row.try_get("id")?),
            client_id: ClientId::from_uuid(row.try_get("client_id")?),
            seller_id: row
                .try_get::<Option<Uuid>, _>("seller_id")?
                .map(SellerId::from_uuid),
            branch_id: row
                .try_get::<Option<Uuid>, _>("branch_id")?
                .map(BranchId::from_uuid),
            payment_method: row.try_get("payment_method")?,
            delivery_date: row.try_get("delivery_date")?,
            origin: row.try_get("origin")?,
            subtotal: Money::new(row.try_get("subtotal")?),
            discount_total: Money::new(row.try_get("discount_total")?),
            tax_total: Money::new(row.try_get("tax_total")?),
            grand_total: Money::new(row.try_get("grand_total")?),
            delivery_point,
            notes: row.try_get("notes")?,
            status: status.parse::<OrderStatus>()?,
            reservation_token: row.try_get("reservation_token")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: LineId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit: row.try_get("unit")?,
            list_price: Money::new(row.try_get("list_price")?),
            final_price: Money::new(row.try_get("final_price")?),
            campaign_id: row
                .try_get::<Option<Uuid>, _>("campaign_id")?
                .map(CampaignId::from_uuid),
            discount_reason: row.try_get("discount_reason")?,
        })
    }

    fn row_to_promotion(row: PgRow) -> Result<AppliedPromotion> {
        Ok(AppliedPromotion {
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            order_line_id: LineId::from_uuid(row.try_get("order_line_id")?),
            campaign_id: CampaignId::from_uuid(row.try_get("campaign_id")?),
            discount_type: row.try_get("discount_type")?,
            discount_value: Money::new(row.try_get("discount_value")?),
            applied_amount: Money::new(row.try_get("applied_amount")?),
        })
    }

    fn row_to_history(row: PgRow) -> Result<StatusHistory> {
        let previous: String = row.try_get("previous_status")?;
        let new: String = row.try_get("new_status")?;

        Ok(StatusHistory {
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            previous_status: previous.parse::<OrderStatus>()?,
            new_status: new.parse::<OrderStatus>()?,
            actor_id: row
                .try_get::<Option<Uuid>, _>("actor_id")?
                .map(UserId::from_uuid),
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        promotions: &[AppliedPromotion],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, client_id, seller_id, branch_id, payment_method,
                delivery_date, origin, subtotal, discount_total, tax_total, grand_total,
                delivery_lat, delivery_lng, notes, status, reservation_token,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.client_id.as_uuid())
        .bind(order.seller_id.map(|id| id.as_uuid()))
        .bind(order.branch_id.map(|id| id.as_uuid()))
        .bind(&order.payment_method)
        .bind(order.delivery_date)
        .bind(&order.origin)
        .bind(order.subtotal.amount())
        .bind(order.discount_total.amount())
        .bind(order.tax_total.amount())
        .bind(order.grand_total.amount())
        .bind(order.delivery_point.map(|p| p.lat))
        .bind(order.delivery_point.map(|p| p.lng))
        .bind(&order.notes)
        .bind(order.status.as_str())
        .bind(&order.reservation_token)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, sku, name, quantity,
                    unit, list_price, final_price, campaign_id, discount_reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.sku)
            .bind(&line.name)
            .bind(line.quantity as i32)
            .bind(&line.unit)
            .bind(line.list_price.amount())
            .bind(line.final_price.amount())
            .bind(line.campaign_id.map(|id| id.as_uuid()))
            .bind(&line.discount_reason)
            .execute(&mut *tx)
            .await?;
        }

        for promotion in promotions {
            sqlx::query(
                r#"
                INSERT INTO applied_promotions (order_id, order_line_id, campaign_id,
                    discount_type, discount_value, applied_amount)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(promotion.order_id.as_uuid())
            .bind(promotion.order_line_id.as_uuid())
            .bind(promotion.campaign_id.as_uuid())
            .bind(&promotion.discount_type)
            .bind(promotion.discount_value.amount())
            .bind(promotion.applied_amount.amount())
            .execute(&mut *tx)
            .await?;
        }

        // NOTIFY delivery is deferred until the transaction commits.
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channels::ORDER_CREATED)
            .bind(order.id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, sku, name, quantity, unit,
                   list_price, final_price, campaign_id, discount_reason
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn get_applied_promotions(&self, id: OrderId) -> Result<Vec<AppliedPromotion>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, order_line_id, campaign_id, discount_type,
                   discount_value, applied_amount
            FROM applied_promotions
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_promotion).collect()
    }

    async fn apply_transition(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        history: &StatusHistory,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(new_status.as_str())
        .bind(history.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(id));
        };
        let order = Self::row_to_order(row)?;

        sqlx::query(
            r#"
            INSERT INTO status_history (order_id, previous_status, new_status,
                actor_id, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(history.order_id.as_uuid())
        .bind(history.previous_status.as_str())
        .bind(history.new_status.as_str())
        .bind(history.actor_id.map(|id| id.as_uuid()))
        .bind(&history.comment)
        .bind(history.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(channel) = channels::for_status(new_status) {
            sqlx::query("SELECT pg_notify($1, $2)")
                .bind(channel)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn get_history(&self, id: OrderId) -> Result<Vec<StatusHistory>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, previous_status, new_status, actor_id, comment, created_at
            FROM status_history
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }
}
