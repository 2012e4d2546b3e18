//! Scripted in-memory identity provider for coordinator and store tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use secrecy::SecretString;

use super::{
    error::IdentityError,
    types::{
        AssuranceLevel, AssuranceLevels, Challenge, Factor, FactorStatus, Session, TotpEnrollment,
        TotpProvisioning, User,
    },
    IdentityProvider,
};

pub(crate) fn session_for(email: &str) -> Session {
    Session {
        access_token: SecretString::from("header.payload.sig".to_string()),
        refresh_token: Some(SecretString::from("refresh".to_string())),
        expires_at: None,
        user: User {
            id: format!("user-{email}"),
            email: Some(email.to_string()),
            metadata: serde_json::Value::Null,
        },
    }
}

pub(crate) fn verified_factor(id: &str) -> Factor {
    Factor {
        id: id.to_string(),
        friendly_name: Some("Authenticator app".to_string()),
        status: FactorStatus::Verified,
        created_at: None,
    }
}

pub(crate) fn unverified_factor(id: &str) -> Factor {
    Factor {
        status: FactorStatus::Unverified,
        ..verified_factor(id)
    }
}

/// Provider whose responses are set up per test.
pub(crate) struct ScriptedProvider {
    pub(crate) session: Mutex<Option<Session>>,
    pub(crate) factors: Mutex<Vec<Factor>>,
    pub(crate) assurance: Mutex<AssuranceLevels>,
    pub(crate) fail_factor_fetch: AtomicBool,
    pub(crate) fail_challenge: AtomicBool,
    pub(crate) challenge_calls: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) unenrolled: Mutex<Vec<String>>,
    enrollments: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            session: Mutex::new(None),
            factors: Mutex::new(Vec::new()),
            assurance: Mutex::new(AssuranceLevels {
                current_level: AssuranceLevel::Aal1,
                next_level: AssuranceLevel::Aal1,
            }),
            fail_factor_fetch: AtomicBool::new(false),
            fail_challenge: AtomicBool::new(false),
            challenge_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            unenrolled: Mutex::new(Vec::new()),
            enrollments: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_session(email: &str) -> Self {
        let provider = Self::new();
        *provider.session.lock().expect("session lock") = Some(session_for(email));
        provider
    }

    pub(crate) fn set_factors(&self, factors: Vec<Factor>) {
        *self.factors.lock().expect("factors lock") = factors;
    }

    pub(crate) fn set_assurance(&self, current: AssuranceLevel, next: AssuranceLevel) {
        *self.assurance.lock().expect("assurance lock") = AssuranceLevels {
            current_level: current,
            next_level: next,
        };
    }

    fn unavailable(what: &str) -> IdentityError {
        IdentityError::Http {
            status: 500,
            message: format!("{what} unavailable"),
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.session.lock().expect("session lock").clone())
    }

    async fn sign_in(
        &self,
        email: &str,
        _password: &SecretString,
    ) -> Result<Session, IdentityError> {
        let session = session_for(email);
        *self.session.lock().expect("session lock") = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        *self.session.lock().expect("session lock") = None;
        Ok(())
    }

    async fn list_factors(&self) -> Result<Vec<Factor>, IdentityError> {
        if self.fail_factor_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable("factors"));
        }
        Ok(self.factors.lock().expect("factors lock").clone())
    }

    async fn enroll_totp(&self, friendly_name: &str) -> Result<TotpEnrollment, IdentityError> {
        let id = format!("factor-{}", self.enrollments.fetch_add(1, Ordering::SeqCst) + 1);
        self.factors.lock().expect("factors lock").push(Factor {
            id: id.clone(),
            friendly_name: Some(friendly_name.to_string()),
            status: FactorStatus::Unverified,
            created_at: None,
        });
        Ok(TotpEnrollment {
            id,
            totp: TotpProvisioning {
                uri: "otpauth://totp/hushh".to_string(),
                secret: "JBSWY3DPEHPK3PXP".to_string(),
                qr_code: None,
            },
        })
    }

    async fn unenroll(&self, factor_id: &str) -> Result<(), IdentityError> {
        self.unenrolled
            .lock()
            .expect("unenrolled lock")
            .push(factor_id.to_string());
        self.factors
            .lock()
            .expect("factors lock")
            .retain(|factor| factor.id != factor_id);
        Ok(())
    }

    async fn create_challenge(&self, factor_id: &str) -> Result<Challenge, IdentityError> {
        if self.fail_challenge.load(Ordering::SeqCst) {
            return Err(Self::unavailable("challenge"));
        }
        let serial = self.challenge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Challenge {
            id: format!("challenge-{serial}"),
            factor_id: factor_id.to_string(),
        })
    }

    async fn verify_enrollment(&self, factor_id: &str, _code: &str) -> Result<(), IdentityError> {
        for factor in self.factors.lock().expect("factors lock").iter_mut() {
            if factor.id == factor_id {
                factor.status = FactorStatus::Verified;
            }
        }
        Ok(())
    }

    async fn verify_challenge(
        &self,
        _factor_id: &str,
        _challenge_id: &str,
        _code: &str,
    ) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn assurance_level(&self) -> Result<AssuranceLevels, IdentityError> {
        Ok(*self.assurance.lock().expect("assurance lock"))
    }

    async fn refresh_session(&self) -> Result<Option<Session>, IdentityError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().expect("session lock").clone())
    }
}
