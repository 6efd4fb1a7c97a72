//! In-process auth context holder.

use crate::ports::{AuthContext, AuthProvider};
use parking_lot::RwLock;
use shared_types::UserRef;

/// Auth context set by the login flow and read on every status change.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    context: RwLock<Option<AuthContext>>,
}

impl StaticAuthProvider {
    /// Signed in as `user`.
    pub fn new(token: impl Into<String>, user: UserRef) -> Self {
        Self {
            context: RwLock::new(Some(AuthContext::new(token, user))),
        }
    }

    /// Not signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, token: impl Into<String>, user: UserRef) {
        *self.context.write() = Some(AuthContext::new(token, user));
    }

    pub fn sign_out(&self) {
        *self.context.write() = None;
    }
}

impl AuthProvider for StaticAuthProvider {
    fn current(&self) -> Option<AuthContext> {
        self.context.read().clone()
    }
}
