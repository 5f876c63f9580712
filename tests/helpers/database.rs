use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use branchdesk::configuration::{DatabaseSettings, Settings};

/// Creates the database named in `config`, then migrates it
pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("failed to connect to database");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("failed to create database");

    let pool = PgPool::connect_with(config.with_db())
        .await
        .expect("failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run database migrations");
    pool
}

/// A freshly migrated database of its own for every caller
pub async fn fresh_database(configuration: &mut Settings) -> PgPool {
    configuration.set_database_name(Uuid::new_v4().to_string());
    configure_database(&configuration.database).await
}
