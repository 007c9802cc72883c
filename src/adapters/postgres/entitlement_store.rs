//! PostgreSQL implementation of EntitlementStore.
//!
//! One row per checkout attempt in `entitlement_records`, with a unique
//! index on email so the authoritative-record-per-email rule is enforced
//! by the database, not by application logic. Pre-checkout notes land in
//! the insert-only `pre_checkout_notes` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{BillingError, EntitlementRecord, EntitlementStatus, PreCheckoutNote};
use crate::ports::EntitlementStore;

/// PostgreSQL implementation of the EntitlementStore port.
pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an entitlement record.
#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    id: String,
    user_id: String,
    user_name: String,
    email: String,
    iq_value: Option<String>,
    amount_total: Option<i64>,
    amount_subtotal: Option<i64>,
    currency: Option<String>,
    payment_method_types: Vec<String>,
    mode: String,
    subscription_id: Option<String>,
    customer_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for EntitlementRecord {
    type Error = BillingError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;

        Ok(EntitlementRecord {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            email: row.email,
            iq_value: row.iq_value,
            amount_total: row.amount_total,
            amount_subtotal: row.amount_subtotal,
            currency: row.currency,
            payment_method_types: row.payment_method_types,
            mode: row.mode,
            subscription_id: row.subscription_id,
            customer_id: row.customer_id,
            status,
            created_at: row.created_at,
        })
    }
}

fn parse_status(s: &str) -> Result<EntitlementStatus, BillingError> {
    match s {
        "pending" => Ok(EntitlementStatus::Pending),
        "completed" => Ok(EntitlementStatus::Completed),
        _ => Err(BillingError::storage(format!("Invalid status value: {}", s))),
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, user_name, email, iq_value, amount_total, amount_subtotal,
           currency, payment_method_types, mode, subscription_id, customer_id,
           status, created_at
    FROM entitlement_records
"#;

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn save(&self, record: &EntitlementRecord) -> Result<(), BillingError> {
        // The email conflict path replaces the previous checkout attempt
        // wholesale, including the primary key (new session id).
        sqlx::query(
            r#"
            INSERT INTO entitlement_records (
                id, user_id, user_name, email, iq_value, amount_total, amount_subtotal,
                currency, payment_method_types, mode, subscription_id, customer_id,
                status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (email) DO UPDATE SET
                id = EXCLUDED.id,
                user_id = EXCLUDED.user_id,
                user_name = EXCLUDED.user_name,
                iq_value = EXCLUDED.iq_value,
                amount_total = EXCLUDED.amount_total,
                amount_subtotal = EXCLUDED.amount_subtotal,
                currency = EXCLUDED.currency,
                payment_method_types = EXCLUDED.payment_method_types,
                mode = EXCLUDED.mode,
                subscription_id = EXCLUDED.subscription_id,
                customer_id = EXCLUDED.customer_id,
                status = EXCLUDED.status,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.user_name)
        .bind(&record.email)
        .bind(&record.iq_value)
        .bind(record.amount_total)
        .bind(record.amount_subtotal)
        .bind(&record.currency)
        .bind(&record.payment_method_types)
        .bind(&record.mode)
        .bind(&record.subscription_id)
        .bind(&record.customer_id)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::storage(format!("Failed to save record: {}", e)))?;

        Ok(())
    }

    async fn update(&self, record: &EntitlementRecord) -> Result<(), BillingError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlement_records SET
                subscription_id = $2,
                status = $3
            WHERE id = $1
            "#,
        )
        .bind(&record.id)
        .bind(&record.subscription_id)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::storage(format!("Failed to update record: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::not_found(&record.email));
        }

        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EntitlementRecord>, BillingError> {
        let row: Option<EntitlementRow> =
            sqlx::query_as(&format!("{} WHERE email = $1", SELECT_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| BillingError::storage(format!("Failed to find record: {}", e)))?;

        row.map(EntitlementRecord::try_from).transpose()
    }

    async fn record_note(&self, note: &PreCheckoutNote) -> Result<(), BillingError> {
        sqlx::query(
            r#"
            INSERT INTO pre_checkout_notes (
                id, user_id, user_name, email, date, iq_value, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(note.id)
        .bind(&note.user_id)
        .bind(&note.user_name)
        .bind(&note.email)
        .bind(&note.date)
        .bind(&note.iq_value)
        .bind(note.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::storage(format!("Failed to record note: {}", e)))?;

        Ok(())
    }
}
