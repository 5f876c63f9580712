use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// The two operator surfaces. Every guarded view and every guarded
/// resolver names exactly one of these.
#[derive(
    Debug, Enum, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(type_name = "operator_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn login_path(&self) -> String {
        format!("/{}/login", self)
    }

    pub fn dashboard_path(&self) -> String {
        format!("/{}/dashboard", self)
    }
}

/// The identity established at login and consulted by the guard.
///
/// A plain role marker the client holds on to between requests, not a
/// signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct Claim {
    pub role: Role,
    pub subject_id: Option<String>,
}

impl Claim {
    pub fn new(role: Role, subject_id: Option<String>) -> Self {
        Self { role, subject_id }
    }

    /// `role` or `role:subject`
    pub fn to_cookie_value(&self) -> String {
        match &self.subject_id {
            Some(subject) => format!("{}:{}", self.role, subject),
            None => self.role.to_string(),
        }
    }
}

impl FromStr for Claim {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, ':');
        let role = Role::from_str(parts.next().unwrap_or_default())?;
        let subject_id = parts
            .next()
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
            .map(str::to_owned);
        Ok(Self { role, subject_id })
    }
}
