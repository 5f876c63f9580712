use std::net::TcpListener;
use std::sync::Arc;
use tempfile::TempDir;

use branchdesk::{
    auth::create_operator,
    configuration::{Settings, StorageBackend},
    models::Role,
    Services,
};

use crate::helpers::{fresh_database, ADMIN_EMAIL, PASSWORD, STAFF_EMAIL, TRACING};

pub struct TestApp {
    pub address: String,
    pub services: Services,
    /// Dropped, and cleaned up, with the app
    pub upload_root: TempDir,
}

/// Starts the full app on a random port with a fresh upload directory, and
/// one admin and one staff operator.
///
/// The store comes from `storage.backend`: in memory by default, a freshly
/// migrated database per app with `APP__STORAGE__BACKEND=postgres`
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// As `spawn_app`, with the configuration adjusted before anything is built
pub async fn spawn_app_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
    lazy_static::initialize(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    std::env::set_var("APP_ENVIRONMENT", "test");
    let mut configuration =
        branchdesk::get_configuration().expect("failed to read configuration");

    let upload_root = tempfile::tempdir().expect("failed to create upload directory");
    configuration.set_upload_root(upload_root.path().to_path_buf());
    configure(&mut configuration);

    let services = match configuration.storage.backend {
        StorageBackend::Memory => Services::in_memory(&configuration),
        StorageBackend::Postgres => {
            let pool = fresh_database(&mut configuration).await;
            Services::postgres(pool, &configuration)
        }
    };
    for (email, role) in [(ADMIN_EMAIL, Role::Admin), (STAFF_EMAIL, Role::Staff)] {
        create_operator(
            services.operators.as_ref(),
            &services.hasher,
            email,
            PASSWORD.to_owned(),
            role,
        )
        .await
        .expect("failed to create test operator");
    }

    let server = branchdesk::build_app(listener, services.clone(), Arc::new(configuration))
        .expect("failed to bind address");

    let _ = tokio::spawn(server);
    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        services,
        upload_root,
    }
}
