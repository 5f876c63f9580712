use actix_web::{error::ResponseError, HttpResponse};
use async_graphql::ErrorExtensions;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::{auth::Decision, models::DocumentType};

/// Bad or missing input on a record submission or edit
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field(s) missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Field {field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("More than one {0} document was attached")]
    DuplicateDocument(DocumentType),
}

impl ValidationError {
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::MissingFields(fields) => fields.iter().map(|f| f.to_string()).collect(),
            Self::Malformed { field, .. } => vec![field.to_string()],
            Self::DuplicateDocument(document_type) => vec![format!("documents.{}", document_type)],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The bytes may not have reached storage. Safe to try again.
    #[error("Upload failed in transit: {0}")]
    TransportFailure(String),

    /// The file itself is unacceptable, trying again will not help
    #[error("Upload rejected: {0}")]
    RejectedFormat(String),
}

impl UploadError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("The record store is temporarily unavailable: {0}")]
    Transient(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Could not find resource")]
    NotFound,
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> StoreError {
        use sqlx::Error::*;

        match e {
            RowNotFound => StoreError::NotFound,
            Database(ref db_error) if db_error.is_unique_violation() => {
                warn!(err = ?e, "unique constraint violated");
                StoreError::Conflict(db_error.message().to_owned())
            }
            _ => {
                error!(err = ?e, "SQLx error occurred");
                StoreError::Transient(e.to_string())
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect credentials provided")]
    InvalidCredential,

    #[error("Sign in is unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("The {document_type} document could not be uploaded: {source}")]
    UploadFailed {
        document_type: DocumentType,
        source: UploadError,
    },

    #[error("The record could not be saved: {0}")]
    StoreFailure(#[from] StoreError),
}

/// The error surfaced to API callers. Every domain error converts into one of
/// these without losing the detail the caller needs to act on it.
#[derive(Debug, Error, PartialEq)]
pub enum BranchDeskError {
    #[error("Could not find resource")]
    NotFound,

    #[error("User is not authorized")]
    Unauthorized { redirect: String },

    #[error("Not authorized to request the specified resource")]
    Forbidden { redirect: String },

    #[error("Incorrect credentials provided")]
    IncorrectCredentials,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    Validation(ValidationError),

    #[error("The {document_type} document could not be uploaded: {source}")]
    UploadFailed {
        document_type: DocumentType,
        source: UploadError,
    },

    #[error("Please try again: {0}")]
    StoreUnavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error")]
    ServerError(String),

    #[error("Unexpected error occurred")]
    UnexpectedError,

    #[error("Unexpected error occurred")]
    CryptoError(#[from] argon2::Error),
}

impl BranchDeskError {
    /// Turns a guard decision into an error, `None` when access is allowed
    pub fn from_decision(decision: Decision) -> Option<Self> {
        match decision {
            Decision::Allow => None,
            Decision::RedirectToLogin(_) => Some(Self::Unauthorized {
                redirect: decision.location().unwrap_or_default(),
            }),
            Decision::RedirectToDashboard(_) => Some(Self::Forbidden {
                redirect: decision.location().unwrap_or_default(),
            }),
        }
    }
}

impl From<ValidationError> for BranchDeskError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for BranchDeskError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(details) => Self::Conflict(details),
            StoreError::Transient(details) => Self::StoreUnavailable(details),
        }
    }
}

impl From<AuthError> for BranchDeskError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredential => Self::IncorrectCredentials,
            AuthError::Unavailable(details) => Self::ServerError(details),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<IngestionError> for BranchDeskError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::Validation(e) => e.into(),
            IngestionError::UploadFailed {
                document_type,
                source,
            } => Self::UploadFailed {
                document_type,
                source,
            },
            IngestionError::StoreFailure(e) => e.into(),
        }
    }
}

impl ErrorExtensions for BranchDeskError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(format!("{}", self)).extend_with(|_, e| match self {
            Self::BadRequest(error) => {
                e.set("status", 400);
                e.set("statusText", "BAD_REQUEST");
                e.set("details", error.to_string());
            }
            Self::Validation(error) => {
                e.set("status", 400);
                e.set("statusText", "VALIDATION_ERROR");
                e.set("details", error.to_string());
                e.set("fields", error.fields());
            }
            Self::UploadFailed {
                document_type,
                source,
            } => {
                e.set("status", 422);
                e.set("statusText", "UPLOAD_FAILED");
                e.set("documentType", document_type.to_string());
                e.set("details", source.to_string());
                e.set("retryable", source.is_retryable());
            }
            Self::Unauthorized { redirect } => {
                e.set("status", 401);
                e.set("statusText", "UNAUTHORIZED");
                e.set("redirect", redirect.as_str());
            }
            Self::IncorrectCredentials => {
                e.set("status", 401);
                e.set("statusText", "UNAUTHORIZED");
            }
            Self::Forbidden { redirect } => {
                e.set("status", 403);
                e.set("statusText", "FORBIDDEN");
                e.set("redirect", redirect.as_str());
            }
            Self::NotFound => {
                e.set("status", 404);
                e.set("statusText", "NOT_FOUND");
            }
            Self::Conflict(error) => {
                e.set("status", 409);
                e.set("statusText", "CONFLICT");
                e.set("details", error.to_string());
            }
            Self::StoreUnavailable(_) => {
                e.set("status", 503);
                e.set("statusText", "TRY_AGAIN");
                e.set("retryable", true);
            }
            Self::ServerError(error) => {
                e.set("status", 500);
                e.set("statusText", "SERVER_ERROR");
                e.set("context", error.to_string());
            }
            Self::UnexpectedError | Self::CryptoError(_) => {
                e.set("status", 500);
                e.set("statusText", "SERVER_ERROR");
            }
        })
    }
}

#[derive(Debug, Serialize)]
struct Messages(Vec<String>);

impl From<Vec<&String>> for Messages {
    fn from(s: Vec<&String>) -> Self {
        Self(s.iter().map(|s| s.to_string()).collect::<Vec<String>>())
    }
}

impl ResponseError for BranchDeskError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::NotFound => HttpResponse::NotFound().finish(),
            Self::Unauthorized { .. } | Self::IncorrectCredentials => {
                HttpResponse::Unauthorized().finish()
            }
            Self::Forbidden { .. } => HttpResponse::Forbidden().finish(),
            Self::BadRequest(error) => {
                HttpResponse::BadRequest().json(Messages::from(vec![error]))
            }
            Self::ServerError(error) => {
                HttpResponse::InternalServerError().json(Messages::from(vec![error]))
            }
            Self::StoreUnavailable(_) => HttpResponse::ServiceUnavailable().finish(),
            // Catch all, as most of the time we should be using GraphQL errors
            _ => HttpResponse::InternalServerError().finish(),
        }
    }
}

impl From<tokio::task::JoinError> for BranchDeskError {
    fn from(e: tokio::task::JoinError) -> BranchDeskError {
        error!(
            err = ?e,
            was_cancelled = e.is_cancelled(),
            did_panic = e.is_panic(),
            "Tokio task join error occurred"
        );
        BranchDeskError::UnexpectedError
    }
}

/// Logs an error at the point it gets converted for the caller
pub fn generate_error_log(error: BranchDeskError, message: Option<&str>) -> BranchDeskError {
    match &error {
        BranchDeskError::UnexpectedError
        | BranchDeskError::ServerError(_)
        | BranchDeskError::CryptoError(_)
        | BranchDeskError::StoreUnavailable(_) => {
            error!(err = ?error, context = message.unwrap_or_default(), "request failed")
        }
        _ => warn!(err = ?error, context = message.unwrap_or_default(), "request rejected"),
    }
    error
}
