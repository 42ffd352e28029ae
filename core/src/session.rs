use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// The account the current session belongs to.
///
/// Set by [`AuthController`](crate::AuthController) after a successful
/// credential exchange and read by account-scoped stores.
#[derive(Clone, Debug, Default)]
pub struct Session {
    account: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn establish(&self, email: &str) {
        *self.account.write() = Some(normalize_account(email));
    }

    pub fn end(&self) {
        self.account.write().take();
    }

    pub fn account(&self) -> Option<String> {
        self.account.read().clone()
    }

    /// Stable directory-safe key for the signed-in account.
    pub fn account_key(&self) -> Option<String> {
        self.account
            .read()
            .as_deref()
            .map(|account| Uuid::new_v5(&Uuid::NAMESPACE_OID, account.as_bytes()).to_string())
    }
}

fn normalize_account(email: &str) -> String {
    email.trim().to_lowercase()
}
