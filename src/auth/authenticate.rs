use argon2::{self, Config, Variant, Version};
use rand::Rng;
use tokio::task::JoinError;
use tracing::warn;
use uuid::Uuid;

use crate::{configuration::AuthSettings, BranchDeskError};

const SALT_LENGTH: usize = 16;

/// Argon2 hashing with a server-side secret and a fresh salt per password
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    secret_key: String,
    mem_cost: u32,
    time_cost: u32,
    lanes: u32,
    /// Verified against when no operator matches, so an unknown email costs
    /// as much as a wrong password
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut hasher = Self {
            secret_key: settings.secret_key.clone(),
            mem_cost: settings.hash_memory_cost,
            time_cost: settings.hash_time_cost,
            lanes: settings.hash_lanes,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher
            .hash_password(&Uuid::new_v4().to_string())
            .unwrap_or_else(|e| {
                warn!(err = ?e, "failed to prepare the unknown operator hash");
                String::new()
            });
        hasher
    }

    fn config(&self) -> Config<'_> {
        Config {
            variant: Variant::Argon2i,
            version: Version::Version13,
            mem_cost: self.mem_cost,
            time_cost: self.time_cost,
            lanes: self.lanes,
            secret: self.secret_key.as_bytes(),
            ad: &[],
            hash_length: 32,
            ..Config::default()
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub fn hash_password(&self, password: &str) -> Result<String, BranchDeskError> {
        let salt: [u8; SALT_LENGTH] = rand::thread_rng().gen();
        let hash = argon2::hash_encoded(password.as_bytes(), &salt, &self.config())?;
        Ok(hash)
    }

    /// A hash that can't be decoded counts as a mismatch, the caller only
    /// ever learns "wrong credentials"
    #[tracing::instrument(skip(self, password, hashed_password))]
    pub fn verify_password(&self, password: &str, hashed_password: &str) -> bool {
        argon2::verify_encoded_ext(
            hashed_password,
            password.as_bytes(),
            self.secret_key.as_bytes(),
            &[],
        )
        .unwrap_or_else(|e| {
            warn!(err = ?e, "stored password hash could not be verified");
            false
        })
    }

    /// Runs on the blocking pool, an argon2 hash would stall an async worker
    pub async fn hash_in_background(&self, password: String) -> Result<String, BranchDeskError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password)).await?
    }

    pub async fn verify_in_background(
        &self,
        password: String,
        hashed_password: String,
    ) -> Result<bool, JoinError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hashed_password))
            .await
    }

    /// Does the work of a real verification and always fails
    pub async fn verify_unknown_in_background(&self, password: String) -> Result<bool, JoinError> {
        self.verify_in_background(password, self.dummy_hash.clone())
            .await
            .map(|_| false)
    }
}
