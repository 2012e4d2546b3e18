//! Interactive sign-in against the configured identity API.
//!
//! Walks the same path the portal does: restore or create a session, settle
//! the MFA outcome (enrolling or answering a challenge with codes read from
//! stdin), then resolve the onboarding route for the signed-in email.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use tracing::debug;

use crate::{
    identity::HttpIdentityProvider,
    onboarding::{FlowObserver, Notice, RegistrationGate, Route, RouteDecision},
    session::AuthClient,
    GIT_COMMIT_HASH,
};

// A fresh enrollment can still require a step-up, so one extra lap is
// normal; more than this means the provider keeps moving the goalposts.
const MAX_MFA_ROUNDS: usize = 3;

pub struct Args {
    pub api_url: String,
    pub api_key: SecretString,
    pub account_api_url: String,
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .field("account_api_url", &self.account_api_url)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

struct ConsoleObserver;

impl FlowObserver for ConsoleObserver {
    fn notify(&self, notice: &Notice) {
        println!("• {}: {}", notice.title, notice.body);
    }

    fn navigate(&self, route: Route) {
        println!("→ https://hushh.ai{}", route.path());
    }
}

/// Run the login flow end to end.
///
/// # Errors
/// Returns an error if sign-in fails, a code is rejected, or the MFA
/// outcome cannot be settled.
pub async fn execute(args: Args) -> Result<()> {
    debug!("build: {GIT_COMMIT_HASH}");

    let provider = Arc::new(HttpIdentityProvider::new(
        &args.api_url,
        args.api_key.clone(),
    )?);
    let client = AuthClient::new(provider);

    client.initialize().await;
    client
        .sign_in(&args.email, &args.password)
        .await
        .context("sign-in failed")?;

    for _ in 0..MAX_MFA_ROUNDS {
        let snapshot = client.snapshot().await;
        if snapshot.mfa_enrollment_needed() {
            let enrollment = client
                .begin_totp_enrollment("Authenticator app")
                .await
                .context("could not start TOTP enrollment")?;
            println!("Add this TOTP secret to your authenticator app:");
            println!("  secret: {}", enrollment.totp.secret);
            println!("  uri:    {}", enrollment.totp.uri);
            let code = prompt_code("Enter the 6-digit code to finish enrollment: ")?;
            client
                .confirm_totp_enrollment(&enrollment.id, &code)
                .await
                .context("enrollment code rejected")?;
        } else if snapshot.mfa_required() {
            let code = prompt_code("Enter the 6-digit code from your authenticator app: ")?;
            client
                .submit_challenge_code(&code)
                .await
                .context("challenge code rejected")?;
        } else {
            break;
        }
    }

    let snapshot = client.snapshot().await;
    if !snapshot.mfa_verified() {
        bail!("MFA status did not settle; sign in again");
    }
    println!("Signed in as {} (MFA verified)", args.email);

    let gate = RegistrationGate::new(&args.account_api_url)?;
    gate.sync_email(snapshot.email()).await;
    if gate
        .resolve_account_route(&snapshot, &ConsoleObserver)
        .await
        == RouteDecision::WaitForAuth
    {
        println!("Session is still settling; run again in a moment.");
    }

    Ok(())
}

fn prompt_code(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read code")?;
    Ok(line.trim().to_string())
}
