//! Contract with the hosted identity service.
//!
//! The service is consumed, never implemented, by this crate: session
//! issuance, factor management, challenges and assurance levels all live on
//! the remote side. The trait below is the full operation set the session
//! store and MFA coordinator need; [`HttpIdentityProvider`] is the production
//! implementation and tests substitute scripted fakes.

pub(crate) mod claims;
pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

use async_trait::async_trait;
use secrecy::SecretString;

pub use client::HttpIdentityProvider;
pub use error::IdentityError;
pub use types::{
    AssuranceLevel, AssuranceLevels, AuthEvent, Challenge, Factor, FactorStatus, Session,
    TotpEnrollment, TotpProvisioning, User,
};

/// Operations consumed from the remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if one is held.
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Password sign-in; a success replaces the held session.
    async fn sign_in(&self, email: &str, password: &SecretString)
        -> Result<Session, IdentityError>;

    /// Invalidate the held session on the remote side.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// All factors registered for the signed-in user, in provider order.
    async fn list_factors(&self) -> Result<Vec<Factor>, IdentityError>;

    /// Begin TOTP enrollment; the returned factor starts unverified.
    async fn enroll_totp(&self, friendly_name: &str) -> Result<TotpEnrollment, IdentityError>;

    /// Remove a factor.
    async fn unenroll(&self, factor_id: &str) -> Result<(), IdentityError>;

    /// Create a step-up challenge against a verified factor.
    async fn create_challenge(&self, factor_id: &str) -> Result<Challenge, IdentityError>;

    /// Verify a first code against a freshly enrolled factor.
    async fn verify_enrollment(&self, factor_id: &str, code: &str) -> Result<(), IdentityError>;

    /// Resolve a pending challenge with a code.
    async fn verify_challenge(
        &self,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> Result<(), IdentityError>;

    /// Current and reachable assurance levels for the held session.
    async fn assurance_level(&self) -> Result<AssuranceLevels, IdentityError>;

    /// Exchange the refresh token for a new session.
    async fn refresh_session(&self) -> Result<Option<Session>, IdentityError>;
}
