use actix_web::{web, HttpRequest, HttpResponse, Result};
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use std::sync::Arc;

use crate::{
    auth::{SessionCredentials, CLAIM_COOKIE},
    graphql::BranchDeskSchema,
};

#[tracing::instrument(name = "graphql", skip(schema, http_request, graphql_request))]
pub async fn graphql_index(
    schema: web::Data<BranchDeskSchema>,
    http_request: HttpRequest,
    graphql_request: GraphQLRequest,
) -> Result<GraphQLResponse> {
    // For every request the claim cookie is loaded and attached to the graphql
    // context as an `Arc<SessionCredentials>`
    let credentials = Arc::new(session_credentials(&http_request));

    let request = graphql_request.into_inner().data(credentials);

    Ok(schema.execute(request).await.into())
}

pub async fn graphql_playground() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(playground_source(GraphQLPlaygroundConfig::new("/")))
}

/// The claim the client sent with this request, if any
pub fn session_credentials(req: &HttpRequest) -> SessionCredentials {
    let cookie = req.cookie(CLAIM_COOKIE);
    SessionCredentials::from_cookie_value(cookie.as_ref().map(|c| c.value()))
}
