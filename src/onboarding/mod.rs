//! Hushh ID onboarding gate.
//!
//! Answers "does a registration profile already exist for this email?" and
//! routes the visitor to either their profile or the registration form. The
//! existence check fails open toward registration: any transport error or
//! unexpected response reads as "not registered", so the visitor is always
//! routed somewhere instead of being stuck. Results are cached per email to
//! avoid redundant lookups.

use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::{identity::IdentityError, session::AuthSnapshot, APP_USER_AGENT};

/// Request timeout for the account API.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gap between surfacing a notice and navigating, so the notice is seen
/// before the route changes.
pub const NOTICE_SETTLE_DELAY: Duration = Duration::from_millis(400);

/// Transient notice surfaced before a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub body: &'static str,
}

pub const SESSION_LOADING: Notice = Notice {
    title: "One moment",
    body: "Your session is still loading. Try again shortly.",
};

pub const GUEST_WELCOME: Notice = Notice {
    title: "Welcome to Hushh",
    body: "Let's create your Hushh ID.",
};

pub const RETURNING_WELCOME: Notice = Notice {
    title: "Welcome back",
    body: "Taking you to your Hushh ID.",
};

pub const NEW_ACCOUNT: Notice = Notice {
    title: "Almost there",
    body: "Finish setting up your Hushh ID.",
};

/// Destination pages the gate can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Profile,
    Registration,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Profile => "/user-profile",
            Self::Registration => "/user-registration",
        }
    }
}

/// Outcome of one routing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Auth state is still loading; nothing to decide yet.
    WaitForAuth,
    Go(Route),
}

/// Receives the gate's user-visible effects.
///
/// Notify and navigate are separate on purpose; the gate owns the pacing
/// between them.
pub trait FlowObserver: Send + Sync {
    fn notify(&self, notice: &Notice);
    fn navigate(&self, route: Route);
}

#[derive(Debug, Default)]
struct RegistrationCache {
    email: Option<String>,
    registered: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CheckUserResponse {
    message: Option<String>,
    exists: Option<bool>,
}

/// Existence checker for Hushh ID registration profiles.
pub struct RegistrationGate {
    http: Client,
    base_url: String,
    cache: Mutex<RegistrationCache>,
}

impl RegistrationGate {
    /// Build a gate for the account API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, IdentityError> {
        let url = Url::parse(base_url)
            .map_err(|err| IdentityError::Config(format!("Invalid account API URL: {err}")))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(IdentityError::Config(format!(
                    "Unsupported account API scheme: {scheme}"
                )))
            }
        }

        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| IdentityError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(RegistrationCache::default()),
        })
    }

    /// Whether a registration profile exists for `email`.
    ///
    /// With `update_state` unset, a cached result for the same email answers
    /// without a request. With it set, the request always fires and the
    /// cache is rewritten. Never errors; failures read as "not registered".
    pub async fn check_registration(&self, email: &str, update_state: bool) -> bool {
        if !update_state {
            let cache = self.cache.lock().await;
            if cache.email.as_deref() == Some(email) {
                if let Some(registered) = cache.registered {
                    return registered;
                }
            }
        }

        let registered = self.fetch_registration(email).await;

        if update_state {
            let mut cache = self.cache.lock().await;
            cache.email = Some(email.to_string());
            cache.registered = Some(registered);
        }

        registered
    }

    /// Track the signed-in email: a new address re-runs the check, a
    /// missing one resets the cache to unknown.
    pub async fn sync_email(&self, email: Option<&str>) {
        match email {
            Some(email) if !email.is_empty() => {
                let already_checked = {
                    let cache = self.cache.lock().await;
                    cache.email.as_deref() == Some(email) && cache.registered.is_some()
                };
                if !already_checked {
                    self.check_registration(email, true).await;
                }
            }
            _ => {
                let mut cache = self.cache.lock().await;
                cache.email = None;
                cache.registered = None;
            }
        }
    }

    /// Decide where a "Get Hushh ID" click should land.
    ///
    /// Loading auth state defers; a missing email is an anonymous visitor
    /// and goes straight to registration; otherwise the cached (or freshly
    /// fetched) existence answer picks profile or registration.
    pub async fn resolve_account_route(
        &self,
        auth: &AuthSnapshot,
        observer: &dyn FlowObserver,
    ) -> RouteDecision {
        if auth.loading {
            observer.notify(&SESSION_LOADING);
            return RouteDecision::WaitForAuth;
        }

        let email = match auth.email() {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => {
                return self
                    .announce(observer, &GUEST_WELCOME, Route::Registration)
                    .await;
            }
        };

        let cached = {
            let cache = self.cache.lock().await;
            if cache.email.as_deref() == Some(email.as_str()) {
                cache.registered
            } else {
                None
            }
        };

        let registered = match cached {
            Some(registered) => registered,
            None => self.check_registration(&email, true).await,
        };

        if registered {
            self.announce(observer, &RETURNING_WELCOME, Route::Profile)
                .await
        } else {
            self.announce(observer, &NEW_ACCOUNT, Route::Registration)
                .await
        }
    }

    async fn announce(
        &self,
        observer: &dyn FlowObserver,
        notice: &Notice,
        route: Route,
    ) -> RouteDecision {
        observer.notify(notice);
        tokio::time::sleep(NOTICE_SETTLE_DELAY).await;
        observer.navigate(route);
        RouteDecision::Go(route)
    }

    async fn fetch_registration(&self, email: &str) -> bool {
        if !valid_email(email) {
            debug!("Skipping registration lookup for malformed email");
            return false;
        }

        let url = format!("{}/check-user", self.base_url);
        let response = match self.http.get(&url).query(&[("email", email)]).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Registration lookup failed: {err}");
                return false;
            }
        };

        if !response.status().is_success() {
            debug!("Registration lookup returned {}", response.status());
            return false;
        }

        match response.json::<CheckUserResponse>().await {
            Ok(body) => {
                body.exists == Some(true) || body.message.as_deref() == Some("User exists")
            }
            Err(err) => {
                warn!("Undecodable registration lookup response: {err}");
                false
            }
        }
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::test_support::session_for;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingObserver {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().expect("events lock").clone()
        }
    }

    impl FlowObserver for RecordingObserver {
        fn notify(&self, notice: &Notice) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("notify:{}", notice.title));
        }

        fn navigate(&self, route: Route) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("navigate:{}", route.path()));
        }
    }

    fn signed_in_snapshot(email: &str) -> AuthSnapshot {
        AuthSnapshot {
            session: Some(session_for(email)),
            loading: false,
            ..AuthSnapshot::default()
        }
    }

    fn signed_out_snapshot() -> AuthSnapshot {
        AuthSnapshot {
            loading: false,
            ..AuthSnapshot::default()
        }
    }

    async fn mount_check_user(server: &MockServer, email: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/check-user"))
            .and(query_param("email", email))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn cached_result_skips_the_second_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/check-user"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "message": "User exists"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        assert!(gate.check_registration("ada@example.com", true).await);
        assert!(gate.check_registration("ada@example.com", false).await);
    }

    #[tokio::test]
    async fn update_state_always_issues_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/check-user"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "exists": true })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        assert!(gate.check_registration("ada@example.com", true).await);
        assert!(gate.check_registration("ada@example.com", true).await);
    }

    #[tokio::test]
    async fn exists_field_and_message_both_confirm() {
        let server = MockServer::start().await;
        mount_check_user(
            &server,
            "ada@example.com",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "exists": true })),
        )
        .await;
        mount_check_user(
            &server,
            "grace@example.com",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "User exists"
            })),
        )
        .await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        assert!(gate.check_registration("ada@example.com", true).await);
        assert!(gate.check_registration("grace@example.com", true).await);
    }

    #[tokio::test]
    async fn failures_read_as_not_registered() {
        let server = MockServer::start().await;
        mount_check_user(&server, "ada@example.com", ResponseTemplate::new(500)).await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        assert!(!gate.check_registration("ada@example.com", true).await);

        // Unreachable host behaves the same way.
        let gate = RegistrationGate::new("http://127.0.0.1:1").expect("valid URL");
        assert!(!gate.check_registration("ada@example.com", true).await);
    }

    #[tokio::test]
    async fn malformed_email_never_hits_the_network() {
        let server = MockServer::start().await;
        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");

        assert!(!gate.check_registration("not-an-email", true).await);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn sync_email_reset_forces_a_fresh_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/check-user"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "exists": true })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        gate.sync_email(Some("ada@example.com")).await;
        // Same email again: cache answers.
        gate.sync_email(Some("ada@example.com")).await;
        assert!(gate.check_registration("ada@example.com", false).await);

        gate.sync_email(None).await;
        assert!(gate.check_registration("ada@example.com", false).await);
    }

    #[tokio::test]
    async fn loading_auth_defers_with_a_notice() {
        let gate = RegistrationGate::new("http://127.0.0.1:1").expect("valid URL");
        let observer = RecordingObserver::default();
        let snapshot = AuthSnapshot::default();

        let decision = gate.resolve_account_route(&snapshot, &observer).await;
        assert_eq!(decision, RouteDecision::WaitForAuth);
        assert_eq!(observer.events(), vec!["notify:One moment".to_string()]);
    }

    #[tokio::test]
    async fn anonymous_visitor_routes_to_registration_without_a_lookup() {
        let server = MockServer::start().await;
        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        let observer = RecordingObserver::default();

        let decision = gate
            .resolve_account_route(&signed_out_snapshot(), &observer)
            .await;

        assert_eq!(decision, RouteDecision::Go(Route::Registration));
        assert_eq!(
            observer.events(),
            vec![
                "notify:Welcome to Hushh".to_string(),
                "navigate:/user-registration".to_string(),
            ]
        );
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn registered_user_routes_to_their_profile() {
        let server = MockServer::start().await;
        mount_check_user(
            &server,
            "ada@example.com",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "User exists"
            })),
        )
        .await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        let observer = RecordingObserver::default();

        let decision = gate
            .resolve_account_route(&signed_in_snapshot("ada@example.com"), &observer)
            .await;

        assert_eq!(decision, RouteDecision::Go(Route::Profile));
        assert_eq!(
            observer.events(),
            vec![
                "notify:Welcome back".to_string(),
                "navigate:/user-profile".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unregistered_user_routes_to_registration() {
        let server = MockServer::start().await;
        mount_check_user(&server, "ada@example.com", ResponseTemplate::new(404)).await;

        let gate = RegistrationGate::new(&server.uri()).expect("valid URL");
        let observer = RecordingObserver::default();

        let decision = gate
            .resolve_account_route(&signed_in_snapshot("ada@example.com"), &observer)
            .await;

        assert_eq!(decision, RouteDecision::Go(Route::Registration));
        assert_eq!(
            observer.events(),
            vec![
                "notify:Almost there".to_string(),
                "navigate:/user-registration".to_string(),
            ]
        );
    }

    #[test]
    fn email_shapes() {
        assert!(valid_email("ada@example.com"));
        assert!(!valid_email("ada@example"));
        assert!(!valid_email("ada example@x.y"));
        assert!(!valid_email(""));
    }
}
