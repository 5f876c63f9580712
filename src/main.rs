use branchdesk::{
    auth::ensure_bootstrap_admin,
    build_app,
    configuration::StorageBackend,
    get_configuration,
    telemetry::{generate_subscriber, init_subscriber},
    Services,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::TcpListener, sync::Arc};

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let subscriber = generate_subscriber(
        String::from("branchdesk"),
        String::from("info"),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("failed to read configuration");

    let services = match configuration.storage.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .acquire_timeout(std::time::Duration::from_secs(2))
                .connect_with(configuration.database.with_db())
                .await
                .expect("failed to connect to database");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("failed to migrate the database");
            Services::postgres(pool, &configuration)
        }
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store, records will not survive a restart");
            Services::in_memory(&configuration)
        }
    };

    if let Some(bootstrap) = &configuration.auth.bootstrap_admin {
        ensure_bootstrap_admin(services.operators.as_ref(), &services.hasher, bootstrap)
            .await
            .expect("failed to create the bootstrap administrator");
    }

    let addr = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(addr)?;

    build_app(listener, services, Arc::new(configuration))?.await
}
