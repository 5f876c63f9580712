use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Role;

/// Someone allowed to sign in to one of the two surfaces
#[derive(Debug, Clone, PartialEq, SimpleObject, sqlx::FromRow)]
pub struct Operator {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[graphql(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOperator {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

impl NewOperator {
    pub fn new(email: &str, role: Role, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalise_email(email),
            role,
            password_hash,
        }
    }
}

/// Emails are compared case-insensitively everywhere
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}
