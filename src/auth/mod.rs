mod authenticate;
mod credentials;
mod guard;
mod login;
mod operators;

pub use authenticate::PasswordHasher;
pub use credentials::{CredentialStore, SessionCredentials, CLAIM_COOKIE};
pub use guard::{authorize, Decision};
pub use login::{login, logout, Credential};
pub use operators::{create_operator, delete_operator, ensure_bootstrap_admin};
