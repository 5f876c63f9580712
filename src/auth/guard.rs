use crate::models::{Claim, Role};

/// What a protected view should do for the current claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Nobody is signed in, send them to the login page for the role the
    /// view needs
    RedirectToLogin(Role),
    /// Signed in, but for the other surface. Send them home.
    RedirectToDashboard(Role),
}

impl Decision {
    /// Where a redirect should point, `None` for `Allow`
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin(role) => Some(role.login_path()),
            Self::RedirectToDashboard(role) => Some(role.dashboard_path()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        *self == Self::Allow
    }
}

/// The single gate in front of every protected view and resolver.
///
/// The claim is passed in by the caller; this never looks at request state
/// or storage itself.
pub fn authorize(required_role: Role, claim: Option<&Claim>) -> Decision {
    match claim {
        None => Decision::RedirectToLogin(required_role),
        Some(claim) if claim.role != required_role => Decision::RedirectToDashboard(claim.role),
        Some(_) => Decision::Allow,
    }
}
