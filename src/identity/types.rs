//! Data model for the identity provider contract.
//!
//! Every identifier here (user id, factor id, challenge id) is an opaque
//! string issued by the remote service; nothing is minted locally.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Account identity attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Current session issued by the identity service.
///
/// Replaced wholesale on every auth event; absent when signed out.
#[derive(Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Status of a registered MFA factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Verified,
    Unverified,
}

impl FactorStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Unverified => "unverified",
        }
    }
}

/// A registered MFA method instance belonging to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub id: String,
    pub friendly_name: Option<String>,
    pub status: FactorStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Factor {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == FactorStatus::Verified
    }
}

/// Short-lived proof-of-possession request created per verification attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: String,
    pub factor_id: String,
}

/// Authenticator assurance level of a session.
///
/// `Aal1` is password only, `Aal2` is password plus a verified factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssuranceLevel {
    Aal1,
    Aal2,
}

impl AssuranceLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aal1 => "aal1",
            Self::Aal2 => "aal2",
        }
    }

    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "aal1" => Some(Self::Aal1),
            "aal2" => Some(Self::Aal2),
            _ => None,
        }
    }
}

/// Current and reachable assurance levels, read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssuranceLevels {
    pub current_level: AssuranceLevel,
    pub next_level: AssuranceLevel,
}

impl AssuranceLevels {
    /// A verified factor exists but this session has not stepped up yet.
    #[must_use]
    pub fn step_up_pending(&self) -> bool {
        self.current_level == AssuranceLevel::Aal1 && self.next_level == AssuranceLevel::Aal2
    }
}

/// TOTP provisioning material returned when enrollment begins.
#[derive(Clone, Deserialize)]
pub struct TotpProvisioning {
    pub uri: String,
    pub secret: String,
    pub qr_code: Option<String>,
}

impl std::fmt::Debug for TotpProvisioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpProvisioning")
            .field("uri", &"***")
            .field("secret", &"***")
            .field("qr_code", &self.qr_code.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A freshly created, not yet verified factor.
#[derive(Debug, Clone, Deserialize)]
pub struct TotpEnrollment {
    pub id: String,
    pub totp: TotpProvisioning,
}

/// Auth state transitions pushed by the identity service.
///
/// Only sign-in, sign-out, token refresh and challenge verification drive
/// local state; everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    MfaChallengeVerified,
    UserUpdated,
}

impl AuthEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::MfaChallengeVerified => "MFA_CHALLENGE_VERIFIED",
            Self::UserUpdated => "USER_UPDATED",
        }
    }

    /// Parse a provider event name; unknown events map to `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "SIGNED_IN" => Some(Self::SignedIn),
            "SIGNED_OUT" => Some(Self::SignedOut),
            "TOKEN_REFRESHED" => Some(Self::TokenRefreshed),
            "MFA_CHALLENGE_VERIFIED" => Some(Self::MfaChallengeVerified),
            "USER_UPDATED" => Some(Self::UserUpdated),
            _ => None,
        }
    }
}
