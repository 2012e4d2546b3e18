//! # Hushh account client
//!
//! Client-side session, MFA, and onboarding coordination for the Hushh
//! account portal.
//!
//! ## Flow overview
//!
//! 1) The [`session::AuthClient`] mirrors the hosted identity service's
//!    session into local state and consumes its pushed auth events.
//! 2) After each sign-in the MFA coordinator checks the user's factors and
//!    assurance level: no verified factor means enrollment, a pending
//!    step-up means a challenge, otherwise the session is verified.
//! 3) The [`onboarding::RegistrationGate`] answers whether a Hushh ID
//!    already exists for the signed-in email and routes the visitor to
//!    their profile or the registration form, failing open toward
//!    registration.
//!
//! ## Boundaries
//!
//! - The identity service is consumed through [`identity::IdentityProvider`];
//!   nothing identity-shaped is implemented here.
//! - The store is the single writer of auth state; UI layers observe
//!   snapshots and trigger actions.
//! - Transient provider failures never force an MFA outcome; the last
//!   settled status stands.

pub mod cli;
pub mod identity;
pub mod mfa;
pub mod onboarding;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
