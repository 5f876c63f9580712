#![allow(dead_code)]
mod app;
mod database;
mod graphql;
mod reqwest;

pub use self::reqwest::*;
pub use app::{spawn_app, spawn_app_with, TestApp};
pub use database::*;
pub use graphql::*;

use lazy_static::lazy_static;

use branchdesk::telemetry::{generate_subscriber, init_subscriber};

lazy_static! {
    /// To ensure logs are only outputted in tests when required, by default
    /// tests run with no logs being captured
    ///
    /// In order to set logs to be captured during tests run them with:
    /// `TEST_LOG=true cargo test | bunyan`
    pub static ref TRACING: () = {
        if std::env::var("TEST_LOG").is_ok() {
            init_subscriber(generate_subscriber("test".into(), "debug".into(), std::io::stdout));
        } else {
            init_subscriber(generate_subscriber("test".into(), "debug".into(), std::io::sink));
        }
    };
}

pub const ADMIN_EMAIL: &str = "admin@branchdesk.test";
pub const STAFF_EMAIL: &str = "staff@branchdesk.test";
pub const PASSWORD: &str = "correct-horse-battery";
