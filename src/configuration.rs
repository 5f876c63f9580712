use config::{Config, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::convert::{TryFrom, TryInto};
use std::env::var;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub uploads: UploadSettings,
    pub auth: AuthSettings,
    #[serde(skip, default = "Environment::default")]
    pub env: Environment,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSettings {
    pub root_dir: PathBuf,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    /// Unreferenced documents younger than this are left alone by
    /// reconciliation, they may belong to a submission still in flight
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub orphan_grace_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub secret_key: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub hash_memory_cost: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub hash_time_cost: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub hash_lanes: u32,
    pub bootstrap_admin: Option<BootstrapOperator>,
}

/// An administrator created at startup if no operator with that email exists
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapOperator {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Test,
    CI,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Local
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("failed to determine current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("failed to parse APP_ENVIRONMENT");

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base")).required(true))
        .add_source(File::from(configuration_directory.join(environment.as_str())).required(true))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    settings.env = environment;
    Ok(settings)
}

impl Settings {
    pub fn set_database_name(&mut self, name: String) {
        self.database.database_name = name;
    }

    pub fn set_upload_root(&mut self, root: PathBuf) {
        self.uploads.root_dir = root;
    }
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Test => "test",
            Environment::CI => "ci",
            Environment::Production => "production",
        }
    }

    /// Cookies only get the `Secure` flag where there's TLS in front of us
    pub fn is_secure(&self) -> bool {
        !matches!(self, Environment::Local | Environment::Test)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "test" => Ok(Self::Test),
            "ci" => Ok(Self::CI),
            "production" => Ok(Self::Production),
            other => Err(format!("{} is not a supported environment", other)),
        }
    }
}
