use actix_web::{http::header::LOCATION, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::{authorize, CredentialStore, Decision},
    documents::content_type_for,
    error::generate_error_log,
    models::{Claim, Role},
    routes::session_credentials,
    startup::Services,
    BranchDeskError,
};

/// What a view renders when the guard lets the request through. Layout is
/// the client's business, this only says which view and for whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDescriptor {
    pub view: String,
    pub role: Role,
    pub subject_id: Option<String>,
}

/// Runs the guard for a protected view. Anything but `Allow` becomes a
/// `303 See Other` to wherever the decision points.
fn guarded(required_role: Role, view: &str, req: &HttpRequest) -> Result<Claim, HttpResponse> {
    let claim = session_credentials(req).get();
    match authorize(required_role, claim.as_ref()) {
        Decision::Allow => claim.ok_or_else(|| redirect(required_role.login_path())),
        decision => {
            let location = decision.location().unwrap_or_else(|| required_role.login_path());
            info!(view, %location, "redirecting away from guarded view");
            Err(redirect(location))
        }
    }
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location))
        .finish()
}

fn render(required_role: Role, view: &str, req: &HttpRequest) -> HttpResponse {
    match guarded(required_role, view, req) {
        Ok(claim) => HttpResponse::Ok().json(ViewDescriptor {
            view: view.to_owned(),
            role: claim.role,
            subject_id: claim.subject_id,
        }),
        Err(response) => response,
    }
}

pub async fn admin_dashboard(req: HttpRequest) -> HttpResponse {
    render(Role::Admin, "adminDashboard", &req)
}

pub async fn admin_customers(req: HttpRequest) -> HttpResponse {
    render(Role::Admin, "adminCustomers", &req)
}

pub async fn admin_staff(req: HttpRequest) -> HttpResponse {
    render(Role::Admin, "adminStaff", &req)
}

pub async fn staff_dashboard(req: HttpRequest) -> HttpResponse {
    render(Role::Staff, "staffDashboard", &req)
}

fn login_page(role: Role, view: &str) -> HttpResponse {
    HttpResponse::Ok().json(ViewDescriptor {
        view: view.to_owned(),
        role,
        subject_id: None,
    })
}

pub async fn admin_login() -> HttpResponse {
    login_page(Role::Admin, "adminLogin")
}

pub async fn staff_login() -> HttpResponse {
    login_page(Role::Staff, "staffLogin")
}

/// Streams a stored identity document back to an administrator
#[tracing::instrument(skip(req, services))]
pub async fn admin_document(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    services: web::Data<Services>,
) -> Result<HttpResponse, BranchDeskError> {
    if let Err(response) = guarded(Role::Admin, "adminDocument", &req) {
        return Ok(response);
    }
    let (document_type, file_name) = path.into_inner();
    let reference = format!("{}/{}", document_type, file_name);

    let bytes = services.inventory.read(&reference).await.map_err(|e| {
        warn!(err = ?e, %reference, "stored document could not be read");
        generate_error_log(BranchDeskError::NotFound, Some(&reference))
    })?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&reference))
        .body(bytes))
}
