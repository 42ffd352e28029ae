use crate::config::AtelierConfig;
use crate::credentials::{
    CredentialExchange, CredentialMode, CredentialResult, HttpCredentialExchange,
};
use crate::navigation::Navigator;
use crate::project::FileProjectStore;
use crate::reconcile::Reconciler;
use crate::session::Session;
use crate::store::FileAnonWorkStore;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of the sign-in flow as seen by observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    ExchangeStarted,
    Settled,
}

impl AuthState {
    pub fn idle() -> Self {
        Self { is_loading: false }
    }

    pub fn apply(self, event: AuthEvent) -> Self {
        match event {
            AuthEvent::ExchangeStarted => Self { is_loading: true },
            AuthEvent::Settled => Self { is_loading: false },
        }
    }
}

/// Marks the flow busy for as long as it is alive.
struct BusyGuard {
    state: Arc<watch::Sender<AuthState>>,
}

impl BusyGuard {
    fn acquire(state: Arc<watch::Sender<AuthState>>) -> Self {
        state.send_modify(|current| *current = current.apply(AuthEvent::ExchangeStarted));
        Self { state }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.state
            .send_modify(|current| *current = current.apply(AuthEvent::Settled));
    }
}

/// Signs users in or up and reconciles their workspace afterwards.
///
/// Each call runs on its own task: dropping the returned future does not stop
/// the exchange or reconciliation, so project creation, clearing anonymous
/// work and navigation always complete once started.
#[derive(Clone)]
pub struct AuthController {
    exchange: Arc<dyn CredentialExchange>,
    reconciler: Reconciler,
    session: Session,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthController {
    pub fn new(exchange: Arc<dyn CredentialExchange>, reconciler: Reconciler) -> Self {
        Self::with_session(exchange, reconciler, Session::new())
    }

    /// Like [`AuthController::new`], but records each accepted account in
    /// `session` before reconciling, so stores sharing it are scoped to
    /// that account.
    pub fn with_session(
        exchange: Arc<dyn CredentialExchange>,
        reconciler: Reconciler,
        session: Session,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::idle());
        Self {
            exchange,
            reconciler,
            session,
            state: Arc::new(state),
        }
    }

    /// Wires the HTTP exchange and the file-backed stores under the
    /// configured data directory. Projects are kept per account.
    pub fn from_config(config: &AtelierConfig, navigator: Arc<dyn Navigator>) -> Self {
        let exchange = HttpCredentialExchange::new(config.auth_base_url.clone());
        let session = Session::new();
        let reconciler = Reconciler::new(
            Arc::new(FileAnonWorkStore::new(&config.data_dir)),
            Arc::new(FileProjectStore::for_session(
                &config.data_dir,
                session.clone(),
            )),
            navigator,
        );
        Self::with_session(Arc::new(exchange), reconciler, session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.authenticate(CredentialMode::SignIn, email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.authenticate(CredentialMode::SignUp, email, password).await
    }

    async fn authenticate(
        &self,
        mode: CredentialMode,
        email: &str,
        password: &str,
    ) -> Result<CredentialResult> {
        let guard = BusyGuard::acquire(Arc::clone(&self.state));
        let flow = tokio::spawn(run_flow(
            guard,
            Arc::clone(&self.exchange),
            self.reconciler.clone(),
            self.session.clone(),
            mode,
            email.to_owned(),
            password.to_owned(),
        ));
        match flow.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(err.into()),
        }
    }
}

async fn run_flow(
    _guard: BusyGuard,
    exchange: Arc<dyn CredentialExchange>,
    reconciler: Reconciler,
    session: Session,
    mode: CredentialMode,
    email: String,
    password: String,
) -> Result<CredentialResult> {
    let result = match mode {
        CredentialMode::SignIn => exchange.sign_in(&email, &password).await?,
        CredentialMode::SignUp => exchange.sign_up(&email, &password).await?,
    };
    if !result.success {
        debug!("mode" = %mode, "credential exchange rejected, skipping reconciliation");
        return Ok(result);
    }
    session.establish(&email);
    reconciler.reconcile().await?;
    Ok(result)
}
