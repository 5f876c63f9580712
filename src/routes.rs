mod graphql;
mod health_check;
mod views;

pub use graphql::{graphql_index, graphql_playground, session_credentials};
pub use health_check::health_check;
pub use views::{
    admin_customers, admin_dashboard, admin_document, admin_login, admin_staff, staff_dashboard,
    staff_login, ViewDescriptor,
};
