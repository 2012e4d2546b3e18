//! Session store for the account portal.
//!
//! Mirrors the identity service's notion of "current session" into local
//! state the rest of the application reads. The store is the only writer;
//! observers subscribe to snapshots and trigger actions, they never mutate
//! fields directly. Auth events pushed by the provider arrive through
//! [`AuthClient::handle_auth_event`] and drive the MFA coordinator.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{watch, Mutex};
use tracing::error;

use crate::{
    identity::{AuthEvent, Factor, IdentityError, IdentityProvider, Session, User},
    mfa::{transition, MfaEvent, MfaStatus},
};

/// Point-in-time view of the auth state.
#[derive(Clone, Debug)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    /// True until the initial session fetch has settled.
    pub loading: bool,
    /// Factors from the last successful fetch; empty when signed out.
    pub factors: Vec<Factor>,
    pub mfa: MfaStatus,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            session: None,
            loading: true,
            factors: Vec::new(),
            mfa: MfaStatus::Unchecked,
        }
    }
}

impl AuthSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user().and_then(|user| user.email.as_deref())
    }

    #[must_use]
    pub fn mfa_enrollment_needed(&self) -> bool {
        self.mfa.enrollment_needed()
    }

    #[must_use]
    pub fn mfa_required(&self) -> bool {
        self.mfa.challenge_required()
    }

    #[must_use]
    pub fn mfa_verified(&self) -> bool {
        self.mfa.verified()
    }

    #[must_use]
    pub fn checking_mfa(&self) -> bool {
        self.mfa.checking()
    }

    #[must_use]
    pub fn current_factor_id(&self) -> Option<&str> {
        self.mfa.factor_id()
    }

    #[must_use]
    pub fn current_challenge_id(&self) -> Option<&str> {
        self.mfa.challenge_id()
    }
}

/// Owns the session and MFA state for one signed-in account.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<AuthSnapshot>,
    updates: watch::Sender<AuthSnapshot>,
    // Serializes status checks so near-simultaneous triggers (initial
    // session fetch racing an auth event) cannot interleave their writes.
    pub(crate) check_guard: Mutex<()>,
}

impl AuthClient {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (updates, _) = watch::channel(AuthSnapshot::default());
        Self {
            provider,
            state: Mutex::new(AuthSnapshot::default()),
            updates,
            check_guard: Mutex::new(()),
        }
    }

    pub(crate) fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Observe snapshots as they change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.updates.subscribe()
    }

    /// Current state, cloned.
    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.lock().await.clone()
    }

    pub(crate) async fn mutate(&self, apply: impl FnOnce(&mut AuthSnapshot)) {
        let mut state = self.state.lock().await;
        apply(&mut state);
        self.updates.send_replace(state.clone());
    }

    pub(crate) async fn apply_mfa_event(&self, event: MfaEvent) {
        self.mutate(|state| state.mfa = transition(state.mfa.clone(), event))
            .await;
    }

    /// Fetch the session once at startup.
    ///
    /// Provider errors are logged and swallowed; `loading` clears in every
    /// path so the caller never hangs on a failed fetch. When a session is
    /// present the MFA check completes before `loading` clears.
    pub async fn initialize(&self) {
        match self.provider.get_session().await {
            Ok(Some(session)) => {
                self.mutate(|state| state.session = Some(session)).await;
                self.check_mfa_status().await;
            }
            Ok(None) => {}
            Err(err) => {
                error!("Failed to restore session: {err}");
            }
        }
        self.mutate(|state| state.loading = false).await;
    }

    /// Consume one auth state transition pushed by the identity service.
    pub async fn handle_auth_event(&self, event: AuthEvent, session: Option<Session>) {
        match event {
            AuthEvent::SignedIn => {
                let Some(session) = session else {
                    return;
                };
                self.mutate(|state| state.session = Some(session)).await;
                self.check_mfa_status().await;
            }
            AuthEvent::SignedOut => {
                self.mutate(|state| {
                    state.session = None;
                    state.factors.clear();
                    state.mfa = transition(state.mfa.clone(), MfaEvent::SignedOut);
                })
                .await;
            }
            AuthEvent::MfaChallengeVerified => {
                self.apply_mfa_event(MfaEvent::ChallengePassed).await;
            }
            AuthEvent::TokenRefreshed => {
                if let Some(session) = session {
                    self.mutate(|state| state.session = Some(session)).await;
                }
            }
            AuthEvent::UserUpdated => {}
        }
    }

    /// Password sign-in; hard errors surface to the caller unchanged.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), IdentityError> {
        let session = self.provider.sign_in(email, password).await?;
        self.handle_auth_event(AuthEvent::SignedIn, Some(session))
            .await;
        Ok(())
    }

    /// Sign out upstream and clear local state.
    ///
    /// Local state clears even when the provider call fails, and even though
    /// the provider's own `SIGNED_OUT` event would clear it again.
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        let result = self.provider.sign_out().await;
        if let Err(err) = &result {
            error!("Sign-out failed upstream: {err}");
        }
        self.handle_auth_event(AuthEvent::SignedOut, None).await;
        result
    }
}
