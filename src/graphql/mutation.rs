use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::{self, Credential},
    graphql::{
        clear_claim_cookie, extract_credentials, extract_services, read_upload, require_role,
        set_claim_cookie, to_graphql_error, DocumentUpload,
    },
    ingestion::{
        reclaim_orphaned_documents, validate_submission, RecordSubmission, ReclaimReport,
    },
    models::{Claim, CustomerRecord, DocumentType, Operator, RecordFields, RecordPatch, Role},
    records::{find_record, update_record, PendingDeletion},
    BranchDeskError,
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Signs an operator in to the surface for `role`. Only an operator of
    /// that role can sign in to it.
    #[tracing::instrument(skip(self, ctx, password))]
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        role: Role,
    ) -> Result<Claim> {
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        let credentials = extract_credentials(ctx).map_err(to_graphql_error)?;
        let claim = auth::login(
            Credential::new(email, password),
            role,
            services.operators.as_ref(),
            &services.hasher,
            credentials.as_ref(),
        )
        .await
        .map_err(to_graphql_error)?;
        set_claim_cookie(ctx, &claim);
        Ok(claim)
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        let credentials = extract_credentials(ctx).map_err(to_graphql_error)?;
        auth::logout(credentials.as_ref());
        clear_claim_cookie(ctx);
        Ok(true)
    }

    /// Creates a customer record along with up to one document of each type.
    /// Nothing is recorded unless every document was stored.
    #[tracing::instrument(skip(self, ctx, fields, documents))]
    async fn submit_record(
        &self,
        ctx: &Context<'_>,
        fields: RecordFields,
        documents: Option<Vec<DocumentUpload>>,
        idempotency_key: Option<Uuid>,
    ) -> Result<CustomerRecord> {
        require_role(ctx, Role::Staff)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;

        // Nothing is read off the request until the fields themselves pass
        let documents = documents.unwrap_or_default();
        let document_types: Vec<DocumentType> =
            documents.iter().map(|upload| upload.document_type).collect();
        validate_submission(&fields, &document_types).map_err(to_graphql_error)?;

        let mut attachments = Vec::new();
        for upload in documents {
            attachments.push(
                read_upload(ctx, upload, services)
                    .await
                    .map_err(to_graphql_error)?,
            );
        }

        let id = services
            .pipeline
            .submit(RecordSubmission {
                fields,
                documents: attachments,
                idempotency_key,
            })
            .await
            .map_err(to_graphql_error)?;
        find_record(services.records.as_ref(), id)
            .await
            .map_err(to_graphql_error)
    }

    #[tracing::instrument(skip(self, ctx, patch))]
    async fn update_record(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        patch: RecordPatch,
    ) -> Result<CustomerRecord> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        update_record(services.records.as_ref(), id, patch)
            .await
            .map_err(to_graphql_error)
    }

    /// Deletes a record. `confirm` must be true, an unconfirmed delete
    /// changes nothing.
    #[tracing::instrument(skip(self, ctx))]
    async fn delete_record(&self, ctx: &Context<'_>, id: Uuid, confirm: bool) -> Result<Uuid> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        let pending = PendingDeletion::new(id);
        let confirmed = pending.confirm_if(confirm).ok_or_else(|| {
            to_graphql_error(BranchDeskError::BadRequest(format!(
                "deleting record {} must be confirmed",
                pending.id()
            )))
        })?;
        confirmed
            .execute(services.records.as_ref())
            .await
            .map_err(to_graphql_error)
    }

    #[tracing::instrument(skip(self, ctx, password))]
    async fn create_operator(
        &self,
        ctx: &Context<'_>,
        #[graphql(validator(email))] email: String,
        #[graphql(validator(min_length = 8))] password: String,
        #[graphql(default_with = "Role::Staff")] role: Role,
    ) -> Result<Operator> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        auth::create_operator(
            services.operators.as_ref(),
            &services.hasher,
            &email,
            password,
            role,
        )
        .await
        .map_err(to_graphql_error)
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn delete_operator(&self, ctx: &Context<'_>, id: Uuid, confirm: bool) -> Result<Uuid> {
        let acting = require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        auth::delete_operator(services.operators.as_ref(), &acting, id, confirm)
            .await
            .map_err(to_graphql_error)
    }

    /// Deletes stored documents that no record references, past the grace
    /// period
    #[tracing::instrument(skip(self, ctx))]
    async fn reclaim_orphaned_documents(&self, ctx: &Context<'_>) -> Result<ReclaimReport> {
        require_role(ctx, Role::Admin)?;
        let services = extract_services(ctx).map_err(to_graphql_error)?;
        reclaim_orphaned_documents(
            services.inventory.as_ref(),
            services.records.as_ref(),
            services.orphan_grace,
            Utc::now(),
        )
        .await
        .map_err(to_graphql_error)
    }
}
