use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{AuthPayload, Client, Error, NewAccount, ProfileSummary, Result, TokenProvider};

/// Credential collaborator: somewhere to keep the session token and the
/// logged-in username. Backing storage is the caller's business.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str);
    fn clear_token(&self);
    fn username(&self) -> Option<String>;
    fn set_username(&self, name: &str);
    fn clear_username(&self);
}

/// Adapts a credential store to the transport's token seam.
pub struct StoreTokens(pub Arc<dyn CredentialStore>);

impl TokenProvider for StoreTokens {
    fn token(&self) -> Option<String> {
        self.0.token()
    }
}

#[derive(Debug, Default)]
struct Credentials {
    token: Option<String>,
    username: Option<String>,
}

/// In-memory credential store. Good for tests and for hosts that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Credentials>,
}

impl CredentialStore for MemoryStore {
    fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    fn set_token(&self, token: &str) {
        self.inner.write().token = Some(token.to_string());
    }

    fn clear_token(&self) {
        self.inner.write().token = None;
    }

    fn username(&self) -> Option<String> {
        self.inner.read().username.clone()
    }

    fn set_username(&self, name: &str) {
        self.inner.write().username = Some(name.to_string());
    }

    fn clear_username(&self) {
        self.inner.write().username = None;
    }
}

/// Owns login/logout against the API and keeps the credential store in
/// step. Core logic reads the session from here, never from ambient
/// globals.
pub struct Manager {
    store: Arc<dyn CredentialStore>,
    client: Arc<Client>,
}

impl Manager {
    pub fn new(store: Arc<dyn CredentialStore>, client: Arc<Client>) -> Self {
        Self { store, client }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        let payload = self.client.login(email, password)?;
        self.store.set_token(&payload.token);
        self.store.set_username(&payload.name);
        Ok(payload)
    }

    pub fn register(&self, account: &NewAccount) -> Result<ProfileSummary> {
        self.client.register(account)
    }

    pub fn logout(&self) {
        self.store.clear_token();
        self.store.clear_username();
    }

    pub fn current_user(&self) -> Option<String> {
        self.store.username()
    }

    /// Auth guard run before token-gated operations.
    pub fn require_auth(&self) -> Result<()> {
        match self.store.token() {
            Some(_) => Ok(()),
            None => Err(Error::Auth(
                "you must be logged in to view this page".into(),
            )),
        }
    }
}
