mod helpers;
mod mutation;
mod query;

use async_graphql::{EmptySubscription, Schema};

pub use helpers::*;
pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub type BranchDeskSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;
