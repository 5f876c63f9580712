use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use crate::models::Claim;

/// Name of the cookie the claim travels in between requests
pub const CLAIM_COOKIE: &str = "role";

/// Holder of the current claim.
///
/// Only login and logout write to it. Nothing caches what it returns, every
/// read goes back to the store.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Claim>;
    fn set(&self, claim: Claim);
    fn clear(&self);
}

/// The claim for a single request, loaded from the `role` cookie.
///
/// Login and logout mutate it and then mirror the change back onto the
/// response as a `Set-Cookie` header.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    claim: Mutex<Option<Claim>>,
}

impl SessionCredentials {
    pub fn new(claim: Option<Claim>) -> Self {
        Self {
            claim: Mutex::new(claim),
        }
    }

    /// A cookie that doesn't parse is treated as no claim at all
    pub fn from_cookie_value(value: Option<&str>) -> Self {
        let claim = value.and_then(|raw| match raw.parse::<Claim>() {
            Ok(claim) => Some(claim),
            Err(e) => {
                warn!(err = ?e, "ignoring unparsable claim cookie");
                None
            }
        });
        Self::new(claim)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Claim>> {
        // The guarded value is a plain Option, a panic mid-write can't leave
        // it half updated
        self.claim.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for SessionCredentials {
    fn get(&self) -> Option<Claim> {
        self.slot().clone()
    }

    fn set(&self, claim: Claim) {
        *self.slot() = Some(claim);
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}
