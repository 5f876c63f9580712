use actix_web::cookie::{Cookie, SameSite};
use async_graphql::{Context, ErrorExtensions, InputObject, Upload};
use std::{io::Read, sync::Arc};
use tracing::error;

use crate::{
    auth::{authorize, CredentialStore, SessionCredentials, CLAIM_COOKIE},
    configuration::{Environment, Settings},
    error::generate_error_log,
    models::{Attachment, Claim, DocumentType, Role},
    startup::Services,
    BranchDeskError, UploadError,
};

/// One file on a record submission, tagged with the document it represents
#[derive(InputObject)]
pub struct DocumentUpload {
    pub document_type: DocumentType,
    pub file: Upload,
}

/// Logs the error and turns it into a GraphQL error with extensions
pub fn to_graphql_error(err: impl Into<BranchDeskError>) -> async_graphql::Error {
    generate_error_log(err.into(), None).extend()
}

pub fn extract_services<'a>(ctx: &'a Context<'_>) -> Result<&'a Services, BranchDeskError> {
    ctx.data::<Services>().map_err(|err| {
        error!(err = ?err, "failed to extract services from graphql context");
        BranchDeskError::ServerError(err.message)
    })
}

pub fn extract_credentials<'a>(
    ctx: &'a Context<'_>,
) -> Result<&'a Arc<SessionCredentials>, BranchDeskError> {
    ctx.data::<Arc<SessionCredentials>>().map_err(|err| {
        error!(err = ?err, "failed to retrieve request credentials from graphql context");
        BranchDeskError::BadRequest("Failed to read the session claim".to_owned())
    })
}

/// The guard for resolvers. The claim comes from the request's credentials
/// and is handed to `authorize` like any other caller.
#[tracing::instrument(skip(ctx))]
pub fn require_role(ctx: &Context<'_>, required_role: Role) -> async_graphql::Result<Claim> {
    let credentials = extract_credentials(ctx).map_err(to_graphql_error)?;
    let claim = credentials.get();
    let decision = authorize(required_role, claim.as_ref());
    match (BranchDeskError::from_decision(decision), claim) {
        (None, Some(claim)) => Ok(claim),
        (Some(err), _) => Err(to_graphql_error(err)),
        (None, None) => Err(to_graphql_error(BranchDeskError::Unauthorized {
            redirect: required_role.login_path(),
        })),
    }
}

fn environment(ctx: &Context<'_>) -> Environment {
    ctx.data_opt::<Arc<Settings>>()
        .map(|settings| settings.env)
        .unwrap_or_default()
}

/// As cookies are set via the `Set-Cookie` header, this generates the string
/// expected as the value. `Secure` is left off where there's no TLS, or the
/// cookie never makes it back from the tests.
fn claim_cookie(value: String, env: Environment) -> Cookie<'static> {
    Cookie::build(CLAIM_COOKIE, value)
        .path("/")
        .http_only(true)
        .secure(env.is_secure())
        .same_site(SameSite::Lax)
        .finish()
}

pub fn set_claim_cookie(ctx: &Context<'_>, claim: &Claim) {
    let cookie = claim_cookie(claim.to_cookie_value(), environment(ctx));
    ctx.append_http_header("Set-Cookie", cookie.to_string());
}

pub fn clear_claim_cookie(ctx: &Context<'_>) {
    let mut cookie = claim_cookie(String::new(), environment(ctx));
    cookie.make_removal();
    ctx.append_http_header("Set-Cookie", cookie.to_string());
}

/// Reads an uploaded file into an `Attachment`, refusing oversized files
/// before their bytes are read
pub async fn read_upload(
    ctx: &Context<'_>,
    upload: DocumentUpload,
    services: &Services,
) -> Result<Attachment, BranchDeskError> {
    let document_type = upload.document_type;
    let rejected = |source: UploadError| BranchDeskError::UploadFailed {
        document_type,
        source,
    };

    let value = upload.file.value(ctx).map_err(|e| {
        rejected(UploadError::TransportFailure(format!(
            "the upload could not be read: {}",
            e
        )))
    })?;
    let size = value
        .size()
        .map_err(|e| rejected(UploadError::TransportFailure(e.to_string())))?;
    services.constraints.check_size(size).map_err(rejected)?;

    let file_name = value.filename.clone();
    let content_type = value.content_type.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut bytes = Vec::new();
        value.into_read().read_to_end(&mut bytes).map(|_| bytes)
    })
    .await?
    .map_err(|e| rejected(UploadError::TransportFailure(e.to_string())))?;

    Ok(Attachment {
        document_type,
        file_name: Some(file_name),
        content_type,
        bytes,
    })
}
