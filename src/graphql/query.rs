use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::CredentialStore,
    documents::StoredDocument,
    graphql::{extract_credentials, extract_services, require_role, to_graphql_error},
    ingestion::find_orphaned_documents,
    models::{
        Claim, CustomerRecord, Operator, RecordFilter, RecordOrder, RecordSortField, Role,
        SortDirection,
    },
    records::{find_record, list_records},
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The claim attached to this request, if any
    #[tracing::instrument(skip(self, ctx))]
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<Claim>> {
        let credentials = extract_credentials(ctx).map_err(to_graphql_error)?;
        Ok(credentials.get())
    }

    /// Customer records, newest first unless another order is requested.
    /// `search` is a case-insensitive substring match over name, account
    /// number and PAN.
    #[tracing::instrument(skip(self, ctx))]
    async fn records(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
        limit: Option<u32>,
        #[graphql(default)] sort_by: RecordSortField,
        #[graphql(default)] direction: SortDirection,
    ) -> Result<Vec<CustomerRecord>> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        let filter = RecordFilter { search, limit };
        let order = RecordOrder {
            field: sort_by,
            direction,
        };
        list_records(services.records.as_ref(), &filter, order)
            .await
            .map_err(to_graphql_error)
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn record(&self, ctx: &Context<'_>, id: Uuid) -> Result<CustomerRecord> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        find_record(services.records.as_ref(), id)
            .await
            .map_err(to_graphql_error)
    }

    /// The latest submissions, for the front-line dashboard
    #[tracing::instrument(skip(self, ctx))]
    async fn recent_records(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 5)] limit: u32,
    ) -> Result<Vec<CustomerRecord>> {
        require_role(ctx, Role::Staff)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        let filter = RecordFilter {
            search: None,
            limit: Some(limit),
        };
        list_records(services.records.as_ref(), &filter, RecordOrder::default())
            .await
            .map_err(to_graphql_error)
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn operators(&self, ctx: &Context<'_>) -> Result<Vec<Operator>> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        services.operators.list().await.map_err(to_graphql_error)
    }

    /// Stored documents no record points at, past the grace period
    #[tracing::instrument(skip(self, ctx))]
    async fn orphaned_documents(&self, ctx: &Context<'_>) -> Result<Vec<StoredDocument>> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        find_orphaned_documents(
            services.inventory.as_ref(),
            services.records.as_ref(),
            services.orphan_grace,
            Utc::now(),
        )
        .await
        .map_err(to_graphql_error)
    }
}
