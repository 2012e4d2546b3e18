//! Multi-factor authentication status for the current session.
//!
//! Flow overview:
//! 1) After every sign-in the coordinator checks the user's factors.
//! 2) No verified factor: the user must enroll before anything else.
//! 3) A verified factor with a pending step-up: a challenge is created and
//!    must be answered with a TOTP code.
//! 4) Otherwise the session is fully verified.
//!
//! The status is a single tagged union driven by a pure [`transition`]
//! function, so exactly one outcome holds at any instant and the in-flight
//! check is visible instead of implied by scattered flags. While a check is
//! in flight the previous outcome stays readable; soft provider failures
//! restore it.

mod coordinator;

use regex::Regex;

use crate::identity::IdentityError;

/// MFA outcome for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaStatus {
    /// No check has run for this session yet.
    Unchecked,
    /// A status check is in flight; `previous` is the last settled outcome.
    Checking { previous: Box<MfaStatus> },
    /// The user has no verified factor and must enroll one.
    EnrollmentNeeded,
    /// A verified factor exists and this session must answer a challenge.
    ChallengeRequired {
        factor_id: String,
        challenge_id: String,
    },
    /// A verified factor exists and no step-up is pending.
    Verified,
}

impl Default for MfaStatus {
    fn default() -> Self {
        Self::Unchecked
    }
}

impl MfaStatus {
    /// The last settled outcome, reading through an in-flight check.
    fn settled(&self) -> &MfaStatus {
        match self {
            Self::Checking { previous } => previous,
            other => other,
        }
    }

    /// A status check is currently in flight.
    #[must_use]
    pub fn checking(&self) -> bool {
        matches!(self, Self::Checking { .. })
    }

    /// The user must enroll a factor before proceeding.
    #[must_use]
    pub fn enrollment_needed(&self) -> bool {
        matches!(self.settled(), Self::EnrollmentNeeded)
    }

    /// The session must answer a pending challenge.
    #[must_use]
    pub fn challenge_required(&self) -> bool {
        matches!(self.settled(), Self::ChallengeRequired { .. })
    }

    /// The session is fully verified.
    #[must_use]
    pub fn verified(&self) -> bool {
        matches!(self.settled(), Self::Verified)
    }

    /// Factor the pending challenge was created against, if any.
    #[must_use]
    pub fn factor_id(&self) -> Option<&str> {
        match self.settled() {
            Self::ChallengeRequired { factor_id, .. } => Some(factor_id),
            _ => None,
        }
    }

    /// Pending challenge id, if any.
    #[must_use]
    pub fn challenge_id(&self) -> Option<&str> {
        match self.settled() {
            Self::ChallengeRequired { challenge_id, .. } => Some(challenge_id),
            _ => None,
        }
    }
}

/// Inputs that advance [`MfaStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaEvent {
    /// A status check began.
    CheckStarted,
    /// Factor or assurance data could not be fetched; keep the last outcome.
    ProviderUnavailable,
    /// The factor list holds no verified entry.
    NoVerifiedFactor,
    /// A challenge was created against a verified factor.
    ChallengeCreated {
        factor_id: String,
        challenge_id: String,
    },
    /// Challenge creation failed; keep the last outcome.
    ChallengeUnavailable,
    /// A verified factor exists and no step-up is pending.
    SteppedUp,
    /// Enrollment finished; the outcome is unknown until the next check.
    EnrollmentCompleted,
    /// The pending challenge was answered successfully.
    ChallengePassed,
    /// The session ended.
    SignedOut,
}

/// Advance the status by one event.
#[must_use]
pub fn transition(current: MfaStatus, event: MfaEvent) -> MfaStatus {
    match (current, event) {
        (_, MfaEvent::SignedOut) => MfaStatus::Unchecked,
        (current @ MfaStatus::Checking { .. }, MfaEvent::CheckStarted) => current,
        (current, MfaEvent::CheckStarted) => MfaStatus::Checking {
            previous: Box::new(current),
        },
        (
            MfaStatus::Checking { previous },
            MfaEvent::ProviderUnavailable | MfaEvent::ChallengeUnavailable,
        ) => *previous,
        (current, MfaEvent::ProviderUnavailable | MfaEvent::ChallengeUnavailable) => current,
        (_, MfaEvent::NoVerifiedFactor) => MfaStatus::EnrollmentNeeded,
        (
            _,
            MfaEvent::ChallengeCreated {
                factor_id,
                challenge_id,
            },
        ) => MfaStatus::ChallengeRequired {
            factor_id,
            challenge_id,
        },
        (_, MfaEvent::SteppedUp | MfaEvent::ChallengePassed) => MfaStatus::Verified,
        (MfaStatus::EnrollmentNeeded, MfaEvent::EnrollmentCompleted) => MfaStatus::Unchecked,
        (current, MfaEvent::EnrollmentCompleted) => current,
    }
}

/// Check a TOTP code's shape before it goes anywhere near the network.
pub(crate) fn validate_totp_code(code: &str) -> Result<(), IdentityError> {
    let valid = Regex::new(r"^[0-9]{6}$").map_or(false, |re| re.is_match(code));
    if valid {
        Ok(())
    } else {
        Err(IdentityError::Validation(
            "verification code must be 6 digits".to_string(),
        ))
    }
}
