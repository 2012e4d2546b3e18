//! HTTP implementation of the identity provider contract.
//!
//! Speaks the hosted identity API under a configured base URL and keeps the
//! current session in memory; callers read it back through `get_session`.
//! All requests share one client with a fixed timeout and the crate user
//! agent, and non-2xx responses surface as typed errors with a truncated
//! body excerpt.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use super::{
    claims,
    error::IdentityError,
    types::{AssuranceLevel, AssuranceLevels, Challenge, Factor, Session, TotpEnrollment, User},
    IdentityProvider,
};
use crate::APP_USER_AGENT;

/// Request timeout applied to every identity call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters carried into error values.
const MAX_ERROR_CHARS: usize = 200;

pub struct HttpIdentityProvider {
    http: Client,
    base_url: String,
    api_key: SecretString,
    session: Mutex<Option<Session>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + ChronoDuration::seconds(seconds)),
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct EnrollRequest<'a> {
    friendly_name: &'a str,
    factor_type: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge_id: Option<&'a str>,
    code: &'a str,
}

impl HttpIdentityProvider {
    /// Build a provider for the identity API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, IdentityError> {
        let url = Url::parse(base_url)
            .map_err(|err| IdentityError::Config(format!("Invalid identity API URL: {err}")))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(IdentityError::Config(format!(
                    "Unsupported identity API scheme: {scheme}"
                )))
            }
        }

        if url.host().is_none() {
            return Err(IdentityError::Config(
                "Identity API URL has no host".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| IdentityError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            session: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn bearer(&self) -> Result<SecretString, IdentityError> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| IdentityError::State("no active session".to_string()))
    }

    fn with_api_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", self.api_key.expose_secret())
    }

    async fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, IdentityError> {
        let token = self.bearer().await?;
        Ok(self
            .with_api_key(builder)
            .bearer_auth(token.expose_secret()))
    }

    async fn store_session(&self, session: Session) {
        let mut held = self.session.lock().await;
        *held = Some(session);
    }
}

#[async_trait::async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.session.lock().await.clone())
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, IdentityError> {
        let request = self
            .with_api_key(self.http.post(self.endpoint("/token")))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant {
                email,
                password: password.expose_secret(),
            });

        let response = request.send().await.map_err(map_request_error)?;
        let tokens: TokenResponse = handle_json_response(response).await?;
        let session = tokens.into_session();
        self.store_session(session.clone()).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let result = match self.authed(self.http.post(self.endpoint("/logout"))).await {
            Ok(request) => match request.send().await.map_err(map_request_error) {
                Ok(response) => handle_empty_response(response).await,
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        // The local session is gone either way; a dangling remote session is
        // the provider's problem, a dangling local one would be ours.
        let mut held = self.session.lock().await;
        *held = None;

        result
    }

    async fn list_factors(&self) -> Result<Vec<Factor>, IdentityError> {
        let request = self.authed(self.http.get(self.endpoint("/factors"))).await?;
        let response = request.send().await.map_err(map_request_error)?;
        handle_json_response(response).await
    }

    async fn enroll_totp(&self, friendly_name: &str) -> Result<TotpEnrollment, IdentityError> {
        let request = self
            .authed(self.http.post(self.endpoint("/factors")))
            .await?
            .json(&EnrollRequest {
                friendly_name,
                factor_type: "totp",
            });
        let response = request.send().await.map_err(map_request_error)?;
        handle_json_response(response).await
    }

    async fn unenroll(&self, factor_id: &str) -> Result<(), IdentityError> {
        let request = self
            .authed(
                self.http
                    .delete(self.endpoint(&format!("/factors/{factor_id}"))),
            )
            .await?;
        let response = request.send().await.map_err(map_request_error)?;
        handle_empty_response(response).await
    }

    async fn create_challenge(&self, factor_id: &str) -> Result<Challenge, IdentityError> {
        let request = self
            .authed(
                self.http
                    .post(self.endpoint(&format!("/factors/{factor_id}/challenge"))),
            )
            .await?;
        let response = request.send().await.map_err(map_request_error)?;
        let challenge: ChallengeResponse = handle_json_response(response).await?;
        Ok(Challenge {
            id: challenge.id,
            factor_id: factor_id.to_string(),
        })
    }

    async fn verify_enrollment(&self, factor_id: &str, code: &str) -> Result<(), IdentityError> {
        let request = self
            .authed(
                self.http
                    .post(self.endpoint(&format!("/factors/{factor_id}/verify"))),
            )
            .await?
            .json(&VerifyRequest {
                challenge_id: None,
                code,
            });
        let response = request.send().await.map_err(map_request_error)?;
        let tokens: TokenResponse = handle_json_response(response).await?;
        self.store_session(tokens.into_session()).await;
        Ok(())
    }

    async fn verify_challenge(
        &self,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> Result<(), IdentityError> {
        let request = self
            .authed(
                self.http
                    .post(self.endpoint(&format!("/factors/{factor_id}/verify"))),
            )
            .await?
            .json(&VerifyRequest {
                challenge_id: Some(challenge_id),
                code,
            });
        let response = request.send().await.map_err(map_request_error)?;
        let tokens: TokenResponse = handle_json_response(response).await?;
        self.store_session(tokens.into_session()).await;
        Ok(())
    }

    async fn assurance_level(&self) -> Result<AssuranceLevels, IdentityError> {
        let token = self.bearer().await?;
        let current_level = claims::assurance_from_token(token.expose_secret())?;

        let factors = self.list_factors().await?;
        let next_level = if factors.iter().any(Factor::is_verified) {
            AssuranceLevel::Aal2
        } else {
            AssuranceLevel::Aal1
        };

        Ok(AssuranceLevels {
            current_level,
            next_level,
        })
    }

    async fn refresh_session(&self) -> Result<Option<Session>, IdentityError> {
        let refresh_token = {
            let session = self.session.lock().await;
            match session.as_ref().and_then(|s| s.refresh_token.clone()) {
                Some(token) => token,
                None => {
                    return Err(IdentityError::State(
                        "no refresh token to renew the session with".to_string(),
                    ))
                }
            }
        };

        let request = self
            .with_api_key(self.http.post(self.endpoint("/token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant {
                refresh_token: refresh_token.expose_secret(),
            });
        let response = request.send().await.map_err(map_request_error)?;
        let tokens: TokenResponse = handle_json_response(response).await?;
        let session = tokens.into_session();
        self.store_session(session.clone()).await;
        Ok(Some(session))
    }
}

/// Maps transport errors into typed variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> IdentityError {
    if err.is_timeout() {
        IdentityError::Timeout("Identity request timed out".to_string())
    } else {
        IdentityError::Network(format!("Unable to reach the identity service: {err}"))
    }
}

/// Parses JSON responses and surfaces HTTP errors with truncated bodies.
async fn handle_json_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, IdentityError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| IdentityError::Parse(format!("Failed to decode response: {err}")))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Http {
            status: status.as_u16(),
            message: sanitize_body(body),
        })
    }
}

async fn handle_empty_response(response: Response) -> Result<(), IdentityError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Http {
            status: status.as_u16(),
            message: sanitize_body(body),
        })
    }
}

fn sanitize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
