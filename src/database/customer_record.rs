use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use crate::{
    models::{CustomerRecord, NewCustomerRecord, RecordFilter, RecordOrder, ValidatedPatch},
    StoreError,
};

const RECORD_COLUMNS: &str = r#"
    id, name, account_number, ifsc_code, pan_number, aadhaar_number,
    mobile_number, debit_card_number, registration_date,
    pan_document_ref, aadhaar_document_ref, debit_card_document_ref,
    created_at, idempotency_key
"#;

/// Persistent home of customer records.
///
/// Implementations must give read-after-write visibility and globally unique
/// ids. `insert` is a single atomic write and is idempotent on the record's
/// idempotency key: inserting a second record with a key that's already
/// stored returns the id of the first one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: NewCustomerRecord) -> Result<Uuid, StoreError>;
    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<CustomerRecord>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<CustomerRecord, StoreError>;
    async fn find_by_idempotency_key(&self, key: Uuid) -> Result<Option<Uuid>, StoreError>;
    async fn update(&self, id: Uuid, patch: &ValidatedPatch) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct CustomerRecordDatabase {
    pool: PgPool,
}

impl CustomerRecordDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for CustomerRecordDatabase {
    #[tracing::instrument(skip(self, record), fields(repository = "customer_record", id = %record.id))]
    async fn insert(&self, record: NewCustomerRecord) -> Result<Uuid, StoreError> {
        let NewCustomerRecord {
            id,
            fields,
            documents,
            idempotency_key,
        } = record;

        let inserted = query_scalar::<_, Uuid>(
            r#"
            INSERT INTO customer_records (
                id, name, account_number, ifsc_code, pan_number, aadhaar_number,
                mobile_number, debit_card_number, registration_date,
                pan_document_ref, aadhaar_document_ref, debit_card_document_ref,
                idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.account_number)
        .bind(&fields.ifsc_code)
        .bind(&fields.pan_number)
        .bind(&fields.aadhaar_number)
        .bind(&fields.mobile_number)
        .bind(&fields.debit_card_number)
        .bind(fields.registration_date)
        .bind(&documents.pan)
        .bind(&documents.aadhaar)
        .bind(&documents.debit_card)
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        match (inserted, idempotency_key) {
            (Some(id), _) => Ok(id),
            // Lost the race to another submission carrying the same key
            (None, Some(key)) => self
                .find_by_idempotency_key(key)
                .await?
                .ok_or(StoreError::NotFound),
            (None, None) => Err(StoreError::Conflict(format!(
                "record {} was not inserted",
                id
            ))),
        }
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_record"))]
    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM customer_records
            WHERE $1::text IS NULL
               OR name ILIKE $1
               OR account_number ILIKE $1
               OR pan_number ILIKE $1
            ORDER BY {}, id
            LIMIT $2
            "#,
            RECORD_COLUMNS,
            order.as_sql()
        );
        let records = query_as::<_, CustomerRecord>(&sql)
            .bind(filter.needle().map(|needle| like_pattern(&needle)))
            .bind(filter.limit.map(i64::from))
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_record"))]
    async fn find_by_id(&self, id: Uuid) -> Result<CustomerRecord, StoreError> {
        let sql = format!("SELECT {} FROM customer_records WHERE id = $1", RECORD_COLUMNS);
        let record = query_as::<_, CustomerRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_record"))]
    async fn find_by_idempotency_key(&self, key: Uuid) -> Result<Option<Uuid>, StoreError> {
        let id = query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM customer_records WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_record"))]
    async fn update(&self, id: Uuid, patch: &ValidatedPatch) -> Result<(), StoreError> {
        let result = query(
            r#"
            UPDATE customer_records
            SET name = COALESCE($2, name),
                account_number = COALESCE($3, account_number),
                ifsc_code = COALESCE($4, ifsc_code),
                pan_number = COALESCE($5, pan_number),
                aadhaar_number = COALESCE($6, aadhaar_number),
                mobile_number = COALESCE($7, mobile_number),
                debit_card_number = CASE WHEN $8 THEN $9 ELSE debit_card_number END,
                registration_date = COALESCE($10, registration_date)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.account_number)
        .bind(&patch.ifsc_code)
        .bind(&patch.pan_number)
        .bind(&patch.aadhaar_number)
        .bind(&patch.mobile_number)
        .bind(patch.debit_card_number.is_some())
        .bind(patch.debit_card_number.clone().flatten())
        .bind(patch.registration_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_record"))]
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = query(
            r#"
            DELETE FROM customer_records WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Wraps a search term for `ILIKE`, escaping the wildcard characters so
/// they match literally
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
