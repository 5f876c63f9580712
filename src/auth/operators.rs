use tracing::info;
use uuid::Uuid;

use crate::{
    auth::PasswordHasher,
    configuration::BootstrapOperator,
    database::OperatorRepository,
    models::{normalise_email, Claim, NewOperator, Operator, Role},
    BranchDeskError, ValidationError,
};

const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let malformed = |reason: &str| ValidationError::Malformed {
        field: "email",
        reason: reason.to_owned(),
    };
    if email.is_empty() {
        return Err(ValidationError::MissingFields(vec!["email"]));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(malformed("contains whitespace"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(malformed("not an email address")),
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::Malformed {
            field: "password",
            reason: format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        });
    }
    Ok(())
}

#[tracing::instrument(skip(operators, hasher, password), fields(service = "operators"))]
pub async fn create_operator(
    operators: &dyn OperatorRepository,
    hasher: &PasswordHasher,
    email: &str,
    password: String,
    role: Role,
) -> Result<Operator, BranchDeskError> {
    let email = normalise_email(email);
    validate_email(&email)?;
    validate_password(&password)?;

    let hash = hasher.hash_in_background(password).await?;
    let operator = operators.create(NewOperator::new(&email, role, hash)).await?;
    info!(id = %operator.id, %role, "operator created");
    Ok(operator)
}

/// Removes an operator account. The caller must have confirmed the delete
/// and may not remove the account they're signed in with.
#[tracing::instrument(skip(operators), fields(service = "operators"))]
pub async fn delete_operator(
    operators: &dyn OperatorRepository,
    acting: &Claim,
    id: Uuid,
    confirmed: bool,
) -> Result<Uuid, BranchDeskError> {
    if !confirmed {
        return Err(BranchDeskError::BadRequest(
            "deleting an operator must be confirmed".to_owned(),
        ));
    }
    if acting.subject_id.as_deref() == Some(id.to_string().as_str()) {
        return Err(BranchDeskError::BadRequest(
            "you cannot delete the account you are signed in with".to_owned(),
        ));
    }
    operators.delete(id).await?;
    info!(%id, "operator deleted");
    Ok(id)
}

/// Makes sure the configured administrator exists, leaving an existing
/// account (and its password) untouched
#[tracing::instrument(skip(operators, hasher, bootstrap), fields(service = "operators", email = %bootstrap.email))]
pub async fn ensure_bootstrap_admin(
    operators: &dyn OperatorRepository,
    hasher: &PasswordHasher,
    bootstrap: &BootstrapOperator,
) -> Result<(), BranchDeskError> {
    if operators
        .find_by_email(&normalise_email(&bootstrap.email))
        .await?
        .is_some()
    {
        return Ok(());
    }
    create_operator(
        operators,
        hasher,
        &bootstrap.email,
        bootstrap.password.clone(),
        Role::Admin,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::InMemoryOperatorRepository, test_helpers::test_hasher};
    use claims::{assert_matches, assert_ok, assert_some};

    #[tokio::test]
    async fn operators_are_created_with_a_hashed_password() {
        let operators = InMemoryOperatorRepository::new();
        let operator = assert_ok!(
            create_operator(
                &operators,
                &test_hasher(),
                "Staff@Bank.test",
                "password123".to_owned(),
                Role::Staff
            )
            .await
        );
        assert_eq!(operator.email, "staff@bank.test");
        assert_ne!(operator.password_hash, "password123");
        assert!(test_hasher().verify_password("password123", &operator.password_hash));
    }

    #[tokio::test]
    async fn bad_emails_and_short_passwords_are_rejected() {
        let operators = InMemoryOperatorRepository::new();
        let hasher = test_hasher();
        assert_matches!(
            create_operator(&operators, &hasher, "not-an-email", "password123".into(), Role::Staff).await,
            Err(BranchDeskError::Validation(ValidationError::Malformed { field: "email", .. }))
        );
        assert_matches!(
            create_operator(&operators, &hasher, "a@b.test", "short".into(), Role::Staff).await,
            Err(BranchDeskError::Validation(ValidationError::Malformed { field: "password", .. }))
        );
        assert_matches!(
            create_operator(&operators, &hasher, "  ", "password123".into(), Role::Staff).await,
            Err(BranchDeskError::Validation(ValidationError::MissingFields(_)))
        );
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let operators = InMemoryOperatorRepository::new();
        let hasher = test_hasher();
        create_operator(&operators, &hasher, "a@b.test", "password123".into(), Role::Staff)
            .await
            .unwrap();
        assert_matches!(
            create_operator(&operators, &hasher, "A@B.test", "password123".into(), Role::Admin).await,
            Err(BranchDeskError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn deletes_need_confirmation_and_spare_the_acting_admin() {
        let operators = InMemoryOperatorRepository::new();
        let hasher = test_hasher();
        let admin = create_operator(&operators, &hasher, "admin@b.test", "password123".into(), Role::Admin)
            .await
            .unwrap();
        let staff = create_operator(&operators, &hasher, "staff@b.test", "password123".into(), Role::Staff)
            .await
            .unwrap();
        let acting = Claim::new(Role::Admin, Some(admin.id.to_string()));

        assert_matches!(
            delete_operator(&operators, &acting, staff.id, false).await,
            Err(BranchDeskError::BadRequest(_))
        );
        assert_matches!(
            delete_operator(&operators, &acting, admin.id, true).await,
            Err(BranchDeskError::BadRequest(_))
        );
        assert_eq!(delete_operator(&operators, &acting, staff.id, true).await, Ok(staff.id));
        assert_eq!(
            delete_operator(&operators, &acting, staff.id, true).await,
            Err(BranchDeskError::NotFound)
        );
    }

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let operators = InMemoryOperatorRepository::new();
        let hasher = test_hasher();
        let bootstrap = BootstrapOperator {
            email: "root@bank.test".to_owned(),
            password: "change-me-please".to_owned(),
        };

        assert_ok!(ensure_bootstrap_admin(&operators, &hasher, &bootstrap).await);
        assert_ok!(ensure_bootstrap_admin(&operators, &hasher, &bootstrap).await);

        let all = operators.list().await.unwrap();
        assert_eq!(all.len(), 1);
        let admin = assert_some!(operators.find_by_email("root@bank.test").await.unwrap());
        assert_eq!(admin.role, Role::Admin);
    }
}
