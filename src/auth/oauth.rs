//! OAuth 2.0 authorization-code client.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AuthError, AuthResult};
use crate::db::UserProfile;

/// Provider endpoints and client credentials.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Absolute URL of `/auth/callback` as registered with the provider.
    pub redirect_url: String,
    /// Space separated
    pub scopes: String,
}

/// Tokens held in a logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthTokens {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Option<Value>,
    id: Option<Value>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    avatar_url: Option<String>,
}

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl UserInfo {
    fn into_profile(self) -> AuthResult<UserProfile> {
        let oauth_id = self
            .sub
            .and_then(id_to_string)
            .or_else(|| self.id.and_then(id_to_string))
            .ok_or_else(|| AuthError::Provider {
                message: "userinfo response has neither 'sub' nor 'id'".to_string(),
            })?;

        Ok(UserProfile {
            oauth_id,
            email: self.email,
            full_name: self.name,
            avatar_url: self.picture.or(self.avatar_url),
        })
    }
}

pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Provider URL the browser is sent to for login.
    pub fn authorize_url(&self, state: &str) -> AuthResult<String> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("scope", self.config.scopes.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::Provider {
            message: format!("invalid authorize URL: {}", e),
        })?;
        Ok(url.into())
    }

    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> AuthResult<OAuthTokens> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ])
        .await
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<OAuthTokens> {
        let mut tokens = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        // Providers may omit the refresh token when it is not rotated
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    #[instrument(skip_all)]
    pub async fn fetch_user(&self, access_token: &str) -> AuthResult<UserProfile> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("svcmap/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;
        let info: UserInfo = check_status(response).await?.json().await?;
        info.into_profile()
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> AuthResult<OAuthTokens> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("client_id", self.config.client_id.as_str()));
        form.push(("client_secret", self.config.client_secret.as_str()));

        let response = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        let body: TokenResponse = check_status(response).await?.json().await?;

        if let Some(error) = body.error {
            return Err(AuthError::Provider {
                message: body.error_description.unwrap_or(error),
            });
        }
        let access_token = body.access_token.ok_or_else(|| AuthError::Provider {
            message: "token response has no access_token".to_string(),
        })?;
        debug!(expires_in = ?body.expires_in, "Received OAuth tokens");

        Ok(OAuthTokens {
            access_token,
            refresh_token: body.refresh_token,
            expires_at: body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

async fn check_status(response: Response) -> AuthResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(AuthError::Provider {
        message: format!("{}: {}", status, text),
    })
}
