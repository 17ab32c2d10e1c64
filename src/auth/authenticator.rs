//! Login flows and session lifecycle.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::assertion;
use super::credential::{Credential, UserCredential};
use super::exchange::{ExchangeOutcome, TokenExchangeClient};
use super::scheduler::{RefreshScheduler, SchedulerMode};
use super::store::{CustomerSession, LoginOrigin, SessionRegistry, SessionStore};
use crate::client::{ClientConfig, Transport};
use crate::{AuthOutcome, AuthStatus, CustomerNumber, Error, Result, SessionState};

/// State shared by the authenticator and its refresh scheduler.
pub(crate) struct AuthContext {
    pub(crate) credential: Credential,
    pub(crate) config: ClientConfig,
    pub(crate) exchange: TokenExchangeClient,
    pub(crate) server: SessionStore,
    pub(crate) customers: SessionRegistry,
    pub(crate) state: RwLock<SessionState>,
    pub(crate) user: OnceLock<UserCredential>,
    pub(crate) active: watch::Sender<bool>,
}

impl AuthContext {
    pub(crate) fn new(
        credential: Credential,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Self {
        let exchange = TokenExchangeClient::new(transport, &credential, &config);
        let (active, _) = watch::channel(false);

        Self {
            credential,
            config,
            exchange,
            server: SessionStore::new(),
            customers: SessionRegistry::new(),
            state: RwLock::new(SessionState::Uninitialized),
            user: OnceLock::new(),
            active,
        }
    }

    pub(crate) async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    #[cfg(test)]
    pub(crate) async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    /// Tokens from a login are kept only while a login is in progress or the
    /// session is active; a stop in the meantime discards them.
    fn accepts_tokens(state: SessionState) -> bool {
        matches!(state, SessionState::Authenticating | SessionState::Active)
    }

    /// Sign an assertion and exchange it for a server token.
    ///
    /// Stores the token on success. Does not touch the session state.
    pub(crate) async fn institution_login(&self) -> AuthOutcome {
        let assertion = match assertion::sign(&self.credential, Utc::now()) {
            Ok(assertion) => assertion,
            Err(e) => {
                warn!(error = %e, "Failed to sign assertion");
                return AuthOutcome::failed(AuthStatus::AssertionError);
            }
        };

        match self.exchange.issue_server_token(&assertion).await {
            ExchangeOutcome::Success { status, tokens } => {
                let state = self.state.read().await;
                if !Self::accepts_tokens(*state) {
                    let current = *state;
                    warn!(state = %current, "Session stopped during institution login; token discarded");
                    return AuthOutcome::failed(AuthStatus::ServerAuthFailed);
                }
                self.server.set(tokens).await;
                drop(state);
                info!(
                    institution = %self.credential.institution(),
                    channel = %self.credential.channel(),
                    "Institution login succeeded"
                );
                AuthOutcome::success(status)
            }
            failure => failed_outcome(failure, AuthStatus::ServerAuthFailed, "Institution login failed"),
        }
    }

    /// Exchange a customer number for a customer token on top of the
    /// server session.
    pub(crate) async fn customer_login(&self, customer: &CustomerNumber) -> AuthOutcome {
        if !self.state().await.is_active() {
            warn!(customer = %customer, "Customer login requires an active server session");
            return AuthOutcome::failed(AuthStatus::CustomerAuthFailed);
        }
        let Some(server) = self.server.get().await else {
            warn!(customer = %customer, "No server token for customer login");
            return AuthOutcome::failed(AuthStatus::CustomerAuthFailed);
        };

        match self
            .exchange
            .issue_customer_token(customer, &server.access_token)
            .await
        {
            ExchangeOutcome::Success { status, tokens } => {
                let state = self.state.read().await;
                if !state.is_active() {
                    let current = *state;
                    warn!(customer = %customer, state = %current, "Server session ended during customer login");
                    return AuthOutcome::failed(AuthStatus::CustomerAuthFailed);
                }
                self.customers
                    .insert(
                        customer.clone(),
                        CustomerSession::new(tokens, LoginOrigin::Customer),
                    )
                    .await;
                drop(state);
                info!(customer = %customer, "Customer login succeeded");
                AuthOutcome::success(status)
            }
            failure => failed_outcome(failure, AuthStatus::CustomerAuthFailed, "Customer login failed"),
        }
    }

    /// Log in with a login name and password; the session is stored under the
    /// returned customer number, or the login name if none is returned.
    pub(crate) async fn user_login(&self, user: &UserCredential) -> AuthOutcome {
        match self.exchange.issue_user_token(user).await {
            ExchangeOutcome::Success { status, tokens } => {
                let customer = tokens
                    .customer_number
                    .clone()
                    .unwrap_or_else(|| CustomerNumber::new(user.login_name()));
                let state = self.state.read().await;
                if !Self::accepts_tokens(*state) {
                    let current = *state;
                    warn!(customer = %customer, state = %current, "Session stopped during user login; token discarded");
                    return AuthOutcome::failed(AuthStatus::CustomerAuthFailed);
                }
                self.customers
                    .insert(customer.clone(), CustomerSession::new(tokens, LoginOrigin::User))
                    .await;
                drop(state);
                info!(customer = %customer, login = %user.login_name(), "User login succeeded");
                AuthOutcome::success(status)
            }
            failure => failed_outcome(failure, AuthStatus::CustomerAuthFailed, "User login failed"),
        }
    }

    /// Repeat the user login with the stored user credential.
    pub(crate) async fn user_relogin(&self) -> AuthOutcome {
        match self.user.get() {
            Some(user) => self.user_login(user).await,
            None => AuthOutcome::failed(AuthStatus::CustomerAuthFailed),
        }
    }

    /// Drop every session and mark the context logged out.
    ///
    /// Holds the state lock throughout, so a login finishing concurrently
    /// either lands before the wipe or sees `LoggedOut` and stores nothing.
    pub(crate) async fn clear(&self) {
        let mut state = self.state.write().await;
        self.active.send_replace(false);
        self.customers.clear().await;
        self.server.clear().await;
        *state = SessionState::LoggedOut;
    }
}

fn failed_outcome(outcome: ExchangeOutcome, status: AuthStatus, message: &str) -> AuthOutcome {
    let http_status = outcome.failure_http_status();
    if let Some(e) = outcome.into_error() {
        warn!(auth_status = %status, http_status, error = %e, "{}", message);
    }
    AuthOutcome {
        http_status,
        auth_status: status,
    }
}

/// Runs the login flows and owns the refresh scheduler.
///
/// One authenticator holds at most one session: [`init`](Self::init) and
/// [`login_user`](Self::login_user) each succeed at most once, and only one
/// of them can be used on a given authenticator.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gtn_rs::auth::Authenticator;
/// use gtn_rs::client::HttpTransport;
/// use gtn_rs::{ClientConfig, Credential};
///
/// # async fn example() -> gtn_rs::Result<()> {
/// let config = ClientConfig::default();
/// let transport = Arc::new(HttpTransport::new("https://api.example.com", &config)?);
/// let auth = Authenticator::new(Credential::from_env()?, transport, config);
///
/// let outcome = auth.init().await?;
/// if outcome.is_success() {
///     auth.init_customer("100234").await;
/// }
///
/// auth.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Authenticator {
    ctx: Arc<AuthContext>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl Authenticator {
    /// Create an authenticator. No network call is made until a login.
    pub fn new(credential: Credential, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            ctx: Arc::new(AuthContext::new(credential, transport, config)),
            scheduler: Mutex::new(None),
        }
    }

    /// Log in as the institution and start the refresh scheduler.
    ///
    /// Login failures are reported in the returned [`AuthOutcome`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if a login was already attempted
    /// on this authenticator. The existing session is left untouched.
    pub async fn init(&self) -> Result<AuthOutcome> {
        self.begin().await?;
        info!(
            institution = %self.ctx.credential.institution(),
            channel = %self.ctx.credential.channel(),
            "Initialising institution session"
        );

        let outcome = self.ctx.institution_login().await;
        Ok(self.finish(outcome, SchedulerMode::Institution).await)
    }

    /// Log in with a login name and password, bypassing the institution
    /// login, and start the refresh scheduler for the user session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if a login was already attempted
    /// on this authenticator.
    pub async fn login_user(&self, user: UserCredential) -> Result<AuthOutcome> {
        self.begin().await?;
        info!(login = %user.login_name(), "Initialising user session");

        let user = self.ctx.user.get_or_init(|| user);
        let outcome = self.ctx.user_login(user).await;
        Ok(self.finish(outcome, SchedulerMode::User).await)
    }

    /// Log in a customer on top of the active server session.
    ///
    /// Returns `CUSTOMER_AUTH_FAILED` with status `-1` if no server session
    /// is active.
    pub async fn init_customer(&self, customer: impl Into<CustomerNumber>) -> AuthOutcome {
        self.ctx.customer_login(&customer.into()).await
    }

    /// Remove a customer's session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] if the customer has no session.
    pub async fn logout_customer(&self, customer: &CustomerNumber) -> Result<()> {
        match self.ctx.customers.remove(customer).await {
            Some(_) => {
                info!(customer = %customer, "Customer logged out");
                Ok(())
            }
            None => Err(Error::UnknownSession(customer.to_string())),
        }
    }

    /// Stop the refresh scheduler and drop every session.
    ///
    /// Waits for the scheduler to exit. An exchange already in flight
    /// completes but is not retried.
    pub async fn stop(&self) {
        self.ctx.active.send_replace(false);

        let handle = self.scheduler.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Refresh scheduler task failed");
            }
        }

        self.ctx.clear().await;
        info!("Session stopped");
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.ctx.state().await
    }

    /// Returns `true` while the refresh scheduler task is running.
    pub async fn is_scheduler_running(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns `true` if the customer has a session whose access token has
    /// not expired.
    pub async fn is_customer_valid(&self, customer: &CustomerNumber) -> bool {
        self.ctx
            .customers
            .get(customer)
            .await
            .is_some_and(|session| session.tokens.access_token_expires_at > Utc::now())
    }

    /// Customer numbers with a live session.
    pub async fn active_customers(&self) -> Vec<CustomerNumber> {
        self.ctx.customers.customers().await
    }

    /// The customer's current access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] if the customer has no session.
    pub async fn customer_access_token(&self, customer: &CustomerNumber) -> Result<SecretString> {
        self.ctx
            .customers
            .get(customer)
            .await
            .map(|session| session.tokens.access_token)
            .ok_or_else(|| Error::UnknownSession(customer.to_string()))
    }

    /// The server's current access token, if a server session exists.
    pub async fn server_access_token(&self) -> Option<SecretString> {
        self.ctx.server.get().await.map(|tokens| tokens.access_token)
    }

    /// The credential this authenticator logs in with.
    pub fn credential(&self) -> &Credential {
        &self.ctx.credential
    }

    /// The server token slot.
    pub fn server_store(&self) -> &SessionStore {
        &self.ctx.server
    }

    /// The customer session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.ctx.customers
    }

    /// Claim the one-shot login slot.
    async fn begin(&self) -> Result<()> {
        let mut state = self.ctx.state.write().await;
        let current = *state;
        if current != SessionState::Uninitialized {
            debug!(state = %current, "Rejecting second login");
            return Err(Error::AlreadyInitialized);
        }
        *state = SessionState::Authenticating;
        Ok(())
    }

    /// Settle the login started by [`begin`](Self::begin). The session only
    /// becomes active if nothing stopped it while the exchange was in flight.
    async fn finish(&self, outcome: AuthOutcome, mode: SchedulerMode) -> AuthOutcome {
        let mut state = self.ctx.state.write().await;

        if *state != SessionState::Authenticating {
            let current = *state;
            drop(state);
            warn!(state = %current, mode = ?mode, "Stopped during login; session discarded");
            self.ctx.clear().await;
            return if outcome.is_success() {
                AuthOutcome::failed(mode.failure_status())
            } else {
                outcome
            };
        }

        if !outcome.is_success() {
            *state = SessionState::LoggedOut;
            return outcome;
        }

        *state = SessionState::Active;
        self.ctx.active.send_replace(true);

        let scheduler = RefreshScheduler::new(self.ctx.clone(), mode);
        *self.scheduler.lock().await = Some(tokio::spawn(scheduler.run()));
        outcome
    }
}

impl Drop for Authenticator {
    fn drop(&mut self) {
        self.ctx.active.send_replace(false);
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("credential", &self.ctx.credential)
            .finish_non_exhaustive()
    }
}
