//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the login action and its configuration.

use crate::cli::actions::{login, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let api_url = matches
        .get_one::<String>("api-url")
        .cloned()
        .context("missing required argument: --api-url")?;

    let api_key = matches
        .get_one::<String>("api-key")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --api-key")?;

    let account_api_url = matches
        .get_one::<String>("account-api-url")
        .cloned()
        .context("missing required argument: --account-api-url")?;

    let email = matches
        .get_one::<String>("email")
        .cloned()
        .context("missing required argument: --email")?;

    let password = matches
        .get_one::<String>("password")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --password")?;

    Ok(Action::Login(login::Args {
        api_url,
        api_key,
        account_api_url,
        email,
        password,
    }))
}
