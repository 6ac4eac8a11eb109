//! Identity seam.
//!
//! The ledger never trusts a caller-supplied user id directly; every entry
//! point resolves the user through an [`IdentityProvider`] and rejects
//! anonymous callers before touching the store.

use uuid::Uuid;

/// Supplies the authenticated user, if any.
pub trait IdentityProvider {
    fn authenticated_user(&self) -> Option<Uuid>;
}

/// Fixed identity for embedding hosts and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentity {
    user: Option<Uuid>,
}

impl StaticIdentity {
    /// An authenticated session for the given user.
    pub fn signed_in(user: Uuid) -> Self {
        Self { user: Some(user) }
    }

    /// An anonymous session.
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn authenticated_user(&self) -> Option<Uuid> {
        self.user
    }
}
