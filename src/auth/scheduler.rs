//! Background token refresh loop.
//!
//! A single task per session polls every live token pair, renews access
//! tokens shortly before they expire and evicts sessions whose refresh
//! token is about to expire. Polling is coarse (seconds) against token
//! lifetimes of hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::authenticator::AuthContext;
use super::exchange::ExchangeOutcome;
use super::store::{CustomerSession, LoginOrigin};
use crate::{AuthStatus, CustomerNumber};

/// Which login the scheduler keeps alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerMode {
    /// Server session plus customer sessions; exits when the server session
    /// is evicted
    Institution,
    /// User sessions only; exits when the last one is evicted
    User,
}

impl SchedulerMode {
    /// Status reported when a login in this mode does not complete.
    pub(crate) fn failure_status(self) -> AuthStatus {
        match self {
            SchedulerMode::Institution => AuthStatus::ServerAuthFailed,
            SchedulerMode::User => AuthStatus::CustomerAuthFailed,
        }
    }
}

/// Result of polling one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollResult {
    /// Nothing to do
    Fresh,
    /// The access token was refreshed
    Renewed,
    /// The server reported failure and the login was repeated successfully
    Relogged,
    /// Refresh or re-login failed; retried next cycle
    Failed,
    /// The session was removed
    Evicted,
    /// The session was replaced or removed while being polled; left as is
    Superseded,
}

pub(crate) struct RefreshScheduler {
    ctx: Arc<AuthContext>,
    mode: SchedulerMode,
    active: watch::Receiver<bool>,
}

impl RefreshScheduler {
    pub(crate) fn new(ctx: Arc<AuthContext>, mode: SchedulerMode) -> Self {
        let active = ctx.active.subscribe();
        Self { ctx, mode, active }
    }

    /// Run until stopped or until the sessions it tracks are gone, then clear
    /// all session state.
    pub(crate) async fn run(mut self) {
        info!(mode = ?self.mode, "Refresh scheduler started");

        while self.is_active() {
            if !self.cycle().await {
                break;
            }
            let interval = self.ctx.config.cycle_interval;
            if !self.pause(interval).await {
                break;
            }
        }

        self.ctx.clear().await;
        info!(mode = ?self.mode, "Refresh scheduler stopped; sessions cleared");
    }

    /// One pass over the server session and every customer session.
    /// Returns `false` when the loop must exit.
    async fn cycle(&mut self) -> bool {
        let gap = self.ctx.config.customer_gap;

        match self.mode {
            SchedulerMode::Institution => {
                if self.poll_server(Utc::now()).await == PollResult::Evicted {
                    return false;
                }
                if !self.pause(gap).await {
                    return false;
                }
            }
            SchedulerMode::User => {
                if self.ctx.customers.is_empty().await {
                    info!("No user sessions left");
                    return false;
                }
            }
        }

        let customers = self.ctx.customers.customers().await;
        debug!(customers = customers.len(), "Polling customer sessions");

        for customer in customers {
            if !self.is_active() {
                return false;
            }
            // Re-read: the pair may have changed since the key list was taken
            let Some(session) = self.ctx.customers.get(&customer).await else {
                continue;
            };
            self.poll_customer(&customer, &session, Utc::now()).await;
            if !self.pause(gap).await {
                return false;
            }
        }

        !(self.mode == SchedulerMode::User && self.ctx.customers.is_empty().await)
    }

    /// Check the server session at `now`.
    pub(crate) async fn poll_server(&self, now: DateTime<Utc>) -> PollResult {
        let Some(tokens) = self.ctx.server.get().await else {
            warn!("No server token to refresh");
            return PollResult::Evicted;
        };
        let margin = self.ctx.config.refresh_margin_chrono();

        if tokens.refresh_expires_within(now, margin) {
            warn!(
                auth_status = %AuthStatus::AuthExpired,
                expires_at = %tokens.refresh_token_expires_at,
                "Server refresh token expiring; evicting session"
            );
            return PollResult::Evicted;
        }
        if !tokens.access_expires_within(now, margin) {
            return PollResult::Fresh;
        }

        debug!(expires_at = %tokens.access_token_expires_at, "Refreshing server token");
        match self
            .ctx
            .exchange
            .refresh_server_token(&tokens.refresh_token, &tokens.access_token)
            .await
        {
            ExchangeOutcome::Success { tokens, .. } => {
                self.ctx.server.set(tokens).await;
                info!(auth_status = %AuthStatus::ServerTokenRenewed, "Server token renewed");
                PollResult::Renewed
            }
            ExchangeOutcome::ServerFailed { server_status, .. } => {
                warn!(server_status = %server_status, "Server token refresh reported failure; logging in again");
                if self.ctx.institution_login().await.is_success() {
                    PollResult::Relogged
                } else {
                    PollResult::Failed
                }
            }
            failure => {
                if let Some(e) = failure.into_error() {
                    warn!(auth_status = %AuthStatus::ServerTokenRenewFailed, error = %e, "Server token refresh failed");
                }
                PollResult::Failed
            }
        }
    }

    /// Check one customer session at `now`.
    ///
    /// Removals and token updates apply only while the registry still holds
    /// `session`'s refresh token, so a concurrent re-login is never undone.
    pub(crate) async fn poll_customer(
        &self,
        customer: &CustomerNumber,
        session: &CustomerSession,
        now: DateTime<Utc>,
    ) -> PollResult {
        let margin = self.ctx.config.refresh_margin_chrono();
        let tokens = &session.tokens;

        if tokens.refresh_expires_within(now, margin) {
            if self
                .ctx
                .customers
                .remove_if_current(customer, &tokens.refresh_token)
                .await
                .is_none()
            {
                debug!(customer = %customer, "Customer session replaced; skipping eviction");
                return PollResult::Superseded;
            }
            info!(
                customer = %customer,
                auth_status = %AuthStatus::AuthExpired,
                "Customer refresh token expiring; session removed"
            );
            return PollResult::Evicted;
        }
        if !tokens.access_expires_within(now, margin) {
            return PollResult::Fresh;
        }

        let bearer = match session.origin {
            LoginOrigin::Customer => match self.ctx.server.get().await {
                Some(server) => server.access_token,
                None => {
                    warn!(customer = %customer, "No server token for customer refresh");
                    return PollResult::Failed;
                }
            },
            LoginOrigin::User => tokens.access_token.clone(),
        };

        debug!(customer = %customer, expires_at = %tokens.access_token_expires_at, "Refreshing customer token");
        match self
            .ctx
            .exchange
            .refresh_customer_token(&tokens.refresh_token, &bearer)
            .await
        {
            ExchangeOutcome::Success { tokens: renewed, .. } => {
                if self
                    .ctx
                    .customers
                    .update_if_current(customer, &tokens.refresh_token, renewed)
                    .await
                {
                    info!(customer = %customer, auth_status = %AuthStatus::CustomerTokenRenewed, "Customer token renewed");
                    PollResult::Renewed
                } else {
                    debug!(customer = %customer, "Customer session changed during refresh; renewal dropped");
                    PollResult::Superseded
                }
            }
            ExchangeOutcome::ServerFailed { server_status, .. } => {
                warn!(
                    customer = %customer,
                    server_status = %server_status,
                    "Customer token refresh reported failure; logging in again"
                );
                if self
                    .ctx
                    .customers
                    .remove_if_current(customer, &tokens.refresh_token)
                    .await
                    .is_none()
                {
                    debug!(customer = %customer, "Customer session changed during refresh; skipping re-login");
                    return PollResult::Superseded;
                }
                let outcome = match session.origin {
                    LoginOrigin::Customer => self.ctx.customer_login(customer).await,
                    LoginOrigin::User => self.ctx.user_relogin().await,
                };
                if outcome.is_success() {
                    PollResult::Relogged
                } else {
                    PollResult::Failed
                }
            }
            failure => {
                if let Some(e) = failure.into_error() {
                    warn!(
                        customer = %customer,
                        auth_status = %AuthStatus::CustomerTokenRenewFailed,
                        error = %e,
                        "Customer token refresh failed"
                    );
                }
                PollResult::Failed
            }
        }
    }

    fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Sleep for `duration` unless stopped first. Returns `false` if the
    /// scheduler was stopped.
    async fn pause(&mut self, duration: Duration) -> bool {
        if !self.is_active() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            changed = self.active.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
        self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use crate::client::transport::testing::StubTransport;
    use crate::client::ClientConfig;
    use crate::{SessionState, TokenPair};
    use chrono::Duration as ChronoDuration;
    use secrecy::ExposeSecret;
    use serde_json::json;

    const SERVER_TOKEN: &str = "/trade/auth/token";
    const SERVER_REFRESH: &str = "/trade/auth/token/refresh";
    const CUSTOMER_TOKEN: &str = "/trade/auth/customer/token";
    const CUSTOMER_REFRESH: &str = "/trade/auth/customer/token/refresh";
    const USER_LOGIN: &str = "/trade/auth/user-login";

    fn context(stub: &Arc<StubTransport>, config: ClientConfig) -> Arc<AuthContext> {
        let credential = Credential::builder()
            .app_key("K")
            .app_secret("S")
            .private_key(include_str!("../../tests/fixtures/test_private_key.b64"))
            .institution("INST")
            .user_id("svc")
            .build()
            .unwrap();
        Arc::new(AuthContext::new(credential, stub.clone(), config))
    }

    fn pair(access: &str, now: DateTime<Utc>, access_in: i64, refresh_in: i64) -> TokenPair {
        TokenPair::new(
            access,
            format!("{access}-R"),
            now + ChronoDuration::milliseconds(access_in),
            now + ChronoDuration::milliseconds(refresh_in),
        )
    }

    fn token_body(access: &str) -> serde_json::Value {
        let now = Utc::now().timestamp_millis();
        json!({
            "accessToken": access,
            "refreshToken": format!("{access}-R"),
            "accessTokenExpiresAt": now + 3_600_000,
            "refreshTokenExpiresAt": now + 86_400_000,
        })
    }

    async fn activate(ctx: &Arc<AuthContext>) {
        ctx.set_state(SessionState::Active).await;
        ctx.active.send_replace(true);
    }

    async fn server_access(ctx: &AuthContext) -> Option<String> {
        ctx.server
            .get()
            .await
            .map(|t| t.access_token.expose_secret().to_string())
    }

    #[tokio::test]
    async fn test_fresh_server_token_not_refreshed() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("A", now, 90_000, 999_999)).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_server(now).await, PollResult::Fresh);
        // Just outside the margin
        assert_eq!(
            scheduler.poll_server(now + ChronoDuration::milliseconds(84_999)).await,
            PollResult::Fresh
        );
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_server_refresh_inside_margin() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(SERVER_REFRESH, 200, token_body("A2"));
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("A", now, 4_000, 999_999)).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_server(now).await, PollResult::Renewed);
        assert_eq!(server_access(&ctx).await.as_deref(), Some("A2"));

        let request = &stub.requests()[0];
        assert_eq!(request.headers["authorization"], "Bearer A");
        assert_eq!(request.body.as_ref().unwrap()["refreshToken"], "A-R");
    }

    #[tokio::test]
    async fn test_server_refresh_expiry_evicts() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("A", now, 1_000, 4_999)).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_server(now).await, PollResult::Evicted);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_server_failed_status_relogs() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(SERVER_REFRESH, 200, json!({"status": "FAILED"}));
        stub.reply(SERVER_TOKEN, 200, token_body("NEW"));
        let ctx = context(&stub, ClientConfig::default());
        activate(&ctx).await;
        let now = Utc::now();
        ctx.server.set(pair("A", now, 1_000, 999_999)).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_server(now).await, PollResult::Relogged);
        assert_eq!(server_access(&ctx).await.as_deref(), Some("NEW"));
        assert_eq!(stub.calls_to(SERVER_TOKEN), 1);
    }

    #[tokio::test]
    async fn test_server_refresh_failure_keeps_token() {
        let stub = Arc::new(StubTransport::new());
        stub.fail(SERVER_REFRESH, "timeout");
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("A", now, 1_000, 999_999)).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_server(now).await, PollResult::Failed);
        assert_eq!(server_access(&ctx).await.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_customer_eviction_leaves_others() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("A", now, 90_000, 999_999)).await;

        let c1 = CustomerNumber::new("C1");
        let c2 = CustomerNumber::new("C2");
        let expiring = CustomerSession::new(pair("C1-A", now, 1_000, 3_000), LoginOrigin::Customer);
        let healthy = CustomerSession::new(pair("C2-A", now, 90_000, 999_999), LoginOrigin::Customer);
        ctx.customers.insert(c1.clone(), expiring.clone()).await;
        ctx.customers.insert(c2.clone(), healthy.clone()).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_customer(&c1, &expiring, now).await, PollResult::Evicted);
        assert_eq!(scheduler.poll_customer(&c2, &healthy, now).await, PollResult::Fresh);

        assert!(!ctx.customers.contains(&c1).await);
        assert!(ctx.customers.contains(&c2).await);
        assert!(ctx.server.is_set().await);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_relogin_between_listing_and_poll_is_kept() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(CUSTOMER_REFRESH, 200, token_body("FROM-STALE"));
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("SERVER", now, 90_000, 999_999)).await;

        let c1 = CustomerNumber::new("C1");
        let expiring = CustomerSession::new(pair("C1-A", now, 1_000, 3_000), LoginOrigin::Customer);
        let stale_access = CustomerSession::new(pair("C1-B", now, 1_000, 999_999), LoginOrigin::Customer);
        let relogged = CustomerSession::new(pair("C1-NEW", now, 90_000, 999_999), LoginOrigin::Customer);
        ctx.customers.insert(c1.clone(), relogged).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(
            scheduler.poll_customer(&c1, &expiring, now).await,
            PollResult::Superseded
        );
        assert_eq!(
            scheduler.poll_customer(&c1, &stale_access, now).await,
            PollResult::Superseded
        );

        let current = ctx.customers.get(&c1).await.unwrap();
        assert_eq!(current.tokens.access_token.expose_secret(), "C1-NEW");
        assert_eq!(stub.calls_to(CUSTOMER_REFRESH), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_reads_session_after_listing() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        activate(&ctx).await;
        let now = Utc::now();
        ctx.server.set(pair("SERVER", now, 3_600_000, 86_400_000)).await;

        let c1 = CustomerNumber::new("C1");
        let c2 = CustomerNumber::new("C2");
        ctx.customers
            .insert(c1.clone(), CustomerSession::new(pair("C1-A", now, 90_000, 999_999), LoginOrigin::Customer))
            .await;
        ctx.customers
            .insert(c2.clone(), CustomerSession::new(pair("C2-A", now, 1_000, 3_000), LoginOrigin::Customer))
            .await;

        // Gaps: server at 0 ms, C1 at 100 ms, C2 at 200 ms
        let handle = tokio::spawn(RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution).run());
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        ctx.customers
            .insert(c2.clone(), CustomerSession::new(pair("C2-NEW", now, 90_000, 999_999), LoginOrigin::Customer))
            .await;
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let current = ctx.customers.get(&c2).await.unwrap();
        assert_eq!(current.tokens.access_token.expose_secret(), "C2-NEW");
        assert!(stub.requests().is_empty());

        ctx.active.send_replace(false);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_customer_refresh_bearer_by_origin() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(CUSTOMER_REFRESH, 200, token_body("NEXT"));
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();
        ctx.server.set(pair("SERVER", now, 90_000, 999_999)).await;

        let c1 = CustomerNumber::new("C1");
        let u1 = CustomerNumber::new("U1");
        let customer = CustomerSession::new(pair("C1-A", now, 1_000, 999_999), LoginOrigin::Customer);
        let user = CustomerSession::new(pair("U1-A", now, 1_000, 999_999), LoginOrigin::User);
        ctx.customers.insert(c1.clone(), customer.clone()).await;
        ctx.customers.insert(u1.clone(), user.clone()).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_customer(&c1, &customer, now).await, PollResult::Renewed);
        assert_eq!(scheduler.poll_customer(&u1, &user, now).await, PollResult::Renewed);

        let requests = stub.requests();
        assert_eq!(requests[0].headers["authorization"], "Bearer SERVER");
        assert_eq!(requests[1].headers["authorization"], "Bearer U1-A");

        let refreshed = ctx.customers.get(&u1).await.unwrap();
        assert_eq!(refreshed.tokens.access_token.expose_secret(), "NEXT");
        assert_eq!(refreshed.origin, LoginOrigin::User);
    }

    #[tokio::test]
    async fn test_customer_failed_status_relogs_via_customer_flow() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(CUSTOMER_REFRESH, 200, json!({"status": "FAILED"}));
        stub.reply(CUSTOMER_TOKEN, 200, token_body("C1-NEW"));
        let ctx = context(&stub, ClientConfig::default());
        activate(&ctx).await;
        let now = Utc::now();
        ctx.server.set(pair("SERVER", now, 90_000, 999_999)).await;

        let c1 = CustomerNumber::new("C1");
        let session = CustomerSession::new(pair("C1-A", now, 1_000, 999_999), LoginOrigin::Customer);
        ctx.customers.insert(c1.clone(), session.clone()).await;

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution);
        assert_eq!(scheduler.poll_customer(&c1, &session, now).await, PollResult::Relogged);

        let relogged = ctx.customers.get(&c1).await.unwrap();
        assert_eq!(relogged.tokens.access_token.expose_secret(), "C1-NEW");
        assert_eq!(stub.calls_to(CUSTOMER_TOKEN), 1);
    }

    #[tokio::test]
    async fn test_failed_relogin_leaves_customer_removed() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(CUSTOMER_REFRESH, 200, json!({"status": "FAILED"}));
        stub.reply(USER_LOGIN, 401, json!({}));
        let ctx = context(&stub, ClientConfig::default());
        let now = Utc::now();

        let u1 = CustomerNumber::new("U1");
        let session = CustomerSession::new(pair("U1-A", now, 1_000, 999_999), LoginOrigin::User);
        ctx.customers.insert(u1.clone(), session.clone()).await;
        let _ = ctx
            .user
            .set(crate::auth::UserCredential::new("jdoe", "pw", "INST"));

        let scheduler = RefreshScheduler::new(ctx.clone(), SchedulerMode::User);
        assert_eq!(scheduler.poll_customer(&u1, &session, now).await, PollResult::Failed);
        assert!(ctx.customers.is_empty().await);
        assert_eq!(stub.calls_to(USER_LOGIN), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_evicts_and_clears_registry() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        activate(&ctx).await;
        let now = Utc::now();
        ctx.server.set(pair("A", now, 1_000, 2_000)).await;
        ctx.customers
            .insert(
                CustomerNumber::new("C1"),
                CustomerSession::new(pair("C1-A", now, 90_000, 999_999), LoginOrigin::Customer),
            )
            .await;

        RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution)
            .run()
            .await;

        assert!(ctx.customers.is_empty().await);
        assert!(!ctx.server.is_set().await);
        assert_eq!(ctx.state().await, SessionState::LoggedOut);
        assert!(!*ctx.active.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_transport_failures() {
        let stub = Arc::new(StubTransport::new());
        stub.fail(SERVER_REFRESH, "connection reset");
        let config = ClientConfig::default().with_cycle_interval(std::time::Duration::from_secs(1));
        let ctx = context(&stub, config);
        activate(&ctx).await;
        ctx.server.set(pair("A", Utc::now(), 1_000, 999_999)).await;

        let handle = tokio::spawn(RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution).run());
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;

        assert!(!handle.is_finished());
        assert!(stub.calls_to(SERVER_REFRESH) >= 2);
        assert!(ctx.server.is_set().await);

        ctx.active.send_replace(false);
        handle.await.unwrap();
        assert_eq!(ctx.state().await, SessionState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_long_pause() {
        let stub = Arc::new(StubTransport::new());
        let config = ClientConfig::default().with_cycle_interval(std::time::Duration::from_secs(3600));
        let ctx = context(&stub, config);
        activate(&ctx).await;
        ctx.server.set(pair("A", Utc::now(), 3_600_000, 86_400_000)).await;

        let handle = tokio::spawn(RefreshScheduler::new(ctx.clone(), SchedulerMode::Institution).run());
        tokio::task::yield_now().await;

        ctx.active.send_replace(false);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
        assert!(!ctx.server.is_set().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_mode_exits_when_registry_empty() {
        let stub = Arc::new(StubTransport::new());
        let ctx = context(&stub, ClientConfig::default());
        activate(&ctx).await;
        ctx.customers
            .insert(
                CustomerNumber::new("U1"),
                CustomerSession::new(pair("U1-A", Utc::now(), 1_000, 2_000), LoginOrigin::User),
            )
            .await;

        RefreshScheduler::new(ctx.clone(), SchedulerMode::User).run().await;

        assert!(ctx.customers.is_empty().await);
        assert_eq!(ctx.state().await, SessionState::LoggedOut);
    }
}
