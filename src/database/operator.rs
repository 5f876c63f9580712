use async_trait::async_trait;
use sqlx::{query, query_as, PgPool};
use uuid::Uuid;

use crate::{
    models::{NewOperator, Operator},
    StoreError,
};

#[async_trait]
pub trait OperatorRepository: Send + Sync {
    /// `email` must already be normalised
    async fn find_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError>;
    async fn list(&self) -> Result<Vec<Operator>, StoreError>;
    async fn create(&self, operator: NewOperator) -> Result<Operator, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct OperatorDatabase {
    pool: PgPool,
}

impl OperatorDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperatorRepository for OperatorDatabase {
    #[tracing::instrument(skip(self), fields(repository = "operator"))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError> {
        let operator = query_as::<_, Operator>(
            r#"
            SELECT id, email, role, password_hash, created_at
            FROM operators WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(operator)
    }

    #[tracing::instrument(skip(self), fields(repository = "operator"))]
    async fn list(&self) -> Result<Vec<Operator>, StoreError> {
        let operators = query_as::<_, Operator>(
            r#"
            SELECT id, email, role, password_hash, created_at
            FROM operators ORDER BY email ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(operators)
    }

    #[tracing::instrument(skip(self, operator), fields(repository = "operator", email = %operator.email))]
    async fn create(&self, operator: NewOperator) -> Result<Operator, StoreError> {
        let operator = query_as::<_, Operator>(
            r#"
            INSERT INTO operators (id, email, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, role, password_hash, created_at
            "#,
        )
        .bind(operator.id)
        .bind(&operator.email)
        .bind(operator.role)
        .bind(&operator.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(operator)
    }

    #[tracing::instrument(skip(self), fields(repository = "operator"))]
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = query(
            r#"
            DELETE FROM operators WHERE id = $1
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
