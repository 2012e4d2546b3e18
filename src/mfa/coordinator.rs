//! Status-check driver and the enrollment/challenge flows.
//!
//! The check mirrors what the identity service knows: factors first, then
//! the assurance level, then (when a step-up is pending) a challenge against
//! the first verified factor in provider order. Transient provider failures
//! never force an outcome; the last settled status stands until a check
//! completes.

use tracing::{error, warn};

use crate::{
    identity::{IdentityError, TotpEnrollment},
    mfa::{validate_totp_code, MfaEvent},
    session::AuthClient,
};

impl AuthClient {
    /// Re-evaluate the MFA outcome for the current session.
    ///
    /// Runs are serialized; a second trigger waits for the first to finish
    /// rather than interleaving writes. Without a session this is a no-op.
    pub async fn check_mfa_status(&self) {
        let _in_flight = self.check_guard.lock().await;

        if !self.snapshot().await.is_authenticated() {
            return;
        }

        self.apply_mfa_event(MfaEvent::CheckStarted).await;

        let factors = match self.provider().list_factors().await {
            Ok(factors) => factors,
            Err(err) => {
                error!("Failed to fetch MFA factors: {err}");
                self.apply_mfa_event(MfaEvent::ProviderUnavailable).await;
                return;
            }
        };

        let first_verified = factors.iter().find(|factor| factor.is_verified()).cloned();
        self.mutate(move |state| state.factors = factors).await;

        let Some(factor) = first_verified else {
            self.apply_mfa_event(MfaEvent::NoVerifiedFactor).await;
            return;
        };

        let levels = match self.provider().assurance_level().await {
            Ok(levels) => levels,
            Err(err) => {
                error!("Failed to read assurance level: {err}");
                self.apply_mfa_event(MfaEvent::ProviderUnavailable).await;
                return;
            }
        };

        if levels.step_up_pending() {
            match self.provider().create_challenge(&factor.id).await {
                Ok(challenge) => {
                    self.apply_mfa_event(MfaEvent::ChallengeCreated {
                        factor_id: challenge.factor_id,
                        challenge_id: challenge.id,
                    })
                    .await;
                }
                Err(err) => {
                    error!("Failed to create MFA challenge: {err}");
                    self.apply_mfa_event(MfaEvent::ChallengeUnavailable).await;
                }
            }
        } else {
            self.apply_mfa_event(MfaEvent::SteppedUp).await;
        }
    }

    /// Re-run the check on demand, e.g. after removing a factor.
    pub async fn refresh_mfa_status(&self) {
        self.check_mfa_status().await;
    }

    /// Mark enrollment as finished and re-check.
    ///
    /// Whether the fresh factor already satisfies the assurance level is the
    /// provider's call, so the outcome comes from a full re-check.
    pub async fn complete_mfa_enrollment(&self) {
        self.apply_mfa_event(MfaEvent::EnrollmentCompleted).await;
        self.check_mfa_status().await;
    }

    /// Mark the pending challenge as passed and refresh the session so
    /// later assurance reads see the step-up.
    pub async fn complete_mfa_verification(&self) {
        self.apply_mfa_event(MfaEvent::ChallengePassed).await;
        match self.provider().refresh_session().await {
            Ok(Some(session)) => {
                self.mutate(|state| state.session = Some(session)).await;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Session refresh after step-up failed: {err}");
            }
        }
    }

    /// Start TOTP enrollment.
    ///
    /// Stale unverified factors block re-enrollment, so any factor that
    /// never finished verification is removed first. Sweep failures are
    /// logged and do not stop the enrollment.
    pub async fn begin_totp_enrollment(
        &self,
        friendly_name: &str,
    ) -> Result<TotpEnrollment, IdentityError> {
        match self.provider().list_factors().await {
            Ok(factors) => {
                for factor in factors.iter().filter(|factor| !factor.is_verified()) {
                    if let Err(err) = self.provider().unenroll(&factor.id).await {
                        warn!(factor_id = %factor.id, "Failed to remove stale factor: {err}");
                    }
                }
            }
            Err(err) => {
                warn!("Could not list factors before enrollment: {err}");
            }
        }

        self.provider().enroll_totp(friendly_name).await
    }

    /// Verify the first code for a freshly enrolled factor.
    ///
    /// The code's shape is checked locally; a malformed code never reaches
    /// the provider.
    pub async fn confirm_totp_enrollment(
        &self,
        factor_id: &str,
        code: &str,
    ) -> Result<(), IdentityError> {
        validate_totp_code(code)?;
        self.provider().verify_enrollment(factor_id, code).await?;
        self.complete_mfa_enrollment().await;
        Ok(())
    }

    /// Answer the pending step-up challenge.
    pub async fn submit_challenge_code(&self, code: &str) -> Result<(), IdentityError> {
        validate_totp_code(code)?;

        let snapshot = self.snapshot().await;
        let (factor_id, challenge_id) = match (
            snapshot.current_factor_id(),
            snapshot.current_challenge_id(),
        ) {
            (Some(factor_id), Some(challenge_id)) => {
                (factor_id.to_string(), challenge_id.to_string())
            }
            _ => {
                return Err(IdentityError::State(
                    "no MFA challenge is pending".to_string(),
                ))
            }
        };

        self.provider()
            .verify_challenge(&factor_id, &challenge_id, code)
            .await?;
        self.complete_mfa_verification().await;
        Ok(())
    }
}
