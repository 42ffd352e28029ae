use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of a credential exchange. A rejected login is a value, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CredentialResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    SignIn,
    SignUp,
}

impl CredentialMode {
    fn endpoint_segment(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::SignUp => "sign-up",
        }
    }
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint_segment())
    }
}

/// Validates credentials and establishes a session.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialResult>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<CredentialResult>;
}

#[derive(Serialize)]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Talks to a remote auth service over JSON.
#[derive(Clone)]
pub struct HttpCredentialExchange {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCredentialExchange {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, mode: CredentialMode) -> String {
        format!("{}/api/auth/{}", self.base_url, mode.endpoint_segment())
    }

    async fn exchange(
        &self,
        mode: CredentialMode,
        email: &str,
        password: &str,
    ) -> Result<CredentialResult> {
        let endpoint = self.endpoint(mode);
        let response = self
            .client
            .post(endpoint.as_str())
            .json(&CredentialRequest { email, password })
            .send()
            .await
            .with_context(|| format!("failed to reach {endpoint}"))?
            .error_for_status()?;
        let result = response
            .json::<CredentialResult>()
            .await
            .with_context(|| format!("invalid credential response from {endpoint}"))?;
        Ok(result)
    }
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.exchange(CredentialMode::SignIn, email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.exchange(CredentialMode::SignUp, email, password).await
    }
}

/// Account table held in process, for smoke runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryCredentialExchange {
    accounts: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryCredentialExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(email: impl Into<String>, password: impl Into<String>) -> Self {
        let exchange = Self::new();
        exchange
            .accounts
            .write()
            .insert(email.into(), password.into());
        exchange
    }
}

#[async_trait]
impl CredentialExchange for InMemoryCredentialExchange {
    async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialResult> {
        match self.accounts.read().get(email) {
            Some(stored) if stored == password => Ok(CredentialResult::succeeded()),
            _ => Ok(CredentialResult::failed("Invalid credentials")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<CredentialResult> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(email) {
            return Ok(CredentialResult::failed("Email already registered"));
        }
        accounts.insert(email.to_owned(), password.to_owned());
        Ok(CredentialResult::succeeded())
    }
}
