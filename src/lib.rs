pub mod auth;
pub mod configuration;
pub mod database;
pub mod documents;
pub mod error;
mod graphql;
pub mod ingestion;
pub mod models;
pub mod records;
pub mod routes;
mod startup;
pub mod telemetry;

#[cfg(test)]
mod test_helpers;

pub use configuration::get_configuration;
pub use error::{
    AuthError, BranchDeskError, IngestionError, StoreError, UploadError, ValidationError,
};
pub use graphql::{BranchDeskSchema, MutationRoot, QueryRoot};
pub use startup::{build_app, generate_schema, Services};
