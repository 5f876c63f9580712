use std::fmt;
use tracing::{error, info, warn};

use crate::{
    auth::{CredentialStore, PasswordHasher},
    database::OperatorRepository,
    models::{normalise_email, Claim, Role},
    AuthError,
};

/// What an operator types into a login form
#[derive(Clone)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

/// Checks a credential for the surface it was submitted on and, only on
/// success, writes the resulting claim.
///
/// An unknown email, a wrong password and an operator of the other role all
/// produce the same `InvalidCredential`.
#[tracing::instrument(
    name = "Operator login",
    skip(credential, operators, hasher, credentials),
    fields(service = "auth", email = %credential.email)
)]
pub async fn login(
    credential: Credential,
    requested_role: Role,
    operators: &dyn OperatorRepository,
    hasher: &PasswordHasher,
    credentials: &dyn CredentialStore,
) -> Result<Claim, AuthError> {
    let email = normalise_email(&credential.email);
    let operator = match operators.find_by_email(&email).await? {
        Some(operator) => operator,
        None => {
            hasher
                .verify_unknown_in_background(credential.password)
                .await
                .map_err(|e| {
                    error!(err = ?e, "password verification task failed");
                    AuthError::Unavailable("password verification was interrupted".to_owned())
                })?;
            warn!("login attempted for an unknown operator");
            return Err(AuthError::InvalidCredential);
        }
    };

    let verified = hasher
        .verify_in_background(credential.password, operator.password_hash.clone())
        .await
        .map_err(|e| {
            error!(err = ?e, "password verification task failed");
            AuthError::Unavailable("password verification was interrupted".to_owned())
        })?;
    if !verified {
        warn!("login attempted with an incorrect password");
        return Err(AuthError::InvalidCredential);
    }
    if operator.role != requested_role {
        warn!(role = %operator.role, "login attempted on the wrong surface");
        return Err(AuthError::InvalidCredential);
    }

    let claim = Claim::new(operator.role, Some(operator.id.to_string()));
    credentials.set(claim.clone());
    info!(role = %claim.role, "operator logged in");
    Ok(claim)
}

#[tracing::instrument(skip(credentials), fields(service = "auth"))]
pub fn logout(credentials: &dyn CredentialStore) {
    credentials.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::SessionCredentials,
        database::InMemoryOperatorRepository,
        models::NewOperator,
        test_helpers::test_hasher,
    };
    use claims::{assert_none, assert_ok, assert_some_eq};

    async fn repository_with(email: &str, password: &str, role: Role) -> InMemoryOperatorRepository {
        let repository = InMemoryOperatorRepository::new();
        let hash = test_hasher().hash_password(password).unwrap();
        repository
            .create(NewOperator::new(email, role, hash))
            .await
            .unwrap();
        repository
    }

    #[tokio::test]
    async fn a_valid_login_writes_the_claim() {
        let operators = repository_with("admin@bank.test", "password123", Role::Admin).await;
        let credentials = SessionCredentials::default();

        let claim = assert_ok!(
            login(
                Credential::new(" Admin@Bank.test ", "password123"),
                Role::Admin,
                &operators,
                &test_hasher(),
                &credentials,
            )
            .await
        );

        assert_eq!(claim.role, Role::Admin);
        assert!(claim.subject_id.is_some());
        assert_some_eq!(credentials.get(), claim);
    }

    #[tokio::test]
    async fn a_wrong_password_writes_nothing() {
        let operators = repository_with("staff@bank.test", "password123", Role::Staff).await;
        let credentials = SessionCredentials::default();

        let result = login(
            Credential::new("staff@bank.test", "guess"),
            Role::Staff,
            &operators,
            &test_hasher(),
            &credentials,
        )
        .await;

        assert_eq!(result, Err(AuthError::InvalidCredential));
        assert_none!(credentials.get());
    }

    #[tokio::test]
    async fn staff_cannot_log_in_to_the_admin_surface() {
        let operators = repository_with("staff@bank.test", "password123", Role::Staff).await;
        let credentials = SessionCredentials::default();

        let result = login(
            Credential::new("staff@bank.test", "password123"),
            Role::Admin,
            &operators,
            &test_hasher(),
            &credentials,
        )
        .await;

        assert_eq!(result, Err(AuthError::InvalidCredential));
        assert_none!(credentials.get());
    }

    #[tokio::test]
    async fn unknown_operators_are_rejected() {
        let operators = InMemoryOperatorRepository::new();
        let credentials = SessionCredentials::default();

        let result = login(
            Credential::new("nobody@bank.test", "password123"),
            Role::Staff,
            &operators,
            &test_hasher(),
            &credentials,
        )
        .await;

        assert_eq!(result, Err(AuthError::InvalidCredential));
    }

    #[tokio::test]
    async fn logout_clears_the_claim() {
        let credentials = SessionCredentials::new(Some(Claim::new(Role::Staff, None)));
        logout(&credentials);
        assert_none!(credentials.get());
    }

    #[test]
    fn passwords_never_show_up_in_debug_output() {
        let debug = format!("{:?}", Credential::new("a@b.c", "hunter22"));
        assert!(!debug.contains("hunter22"));
    }
}
