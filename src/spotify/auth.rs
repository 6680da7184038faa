use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::{ConfigError, ExchangeError, RefreshError},
    types::{AuthorizationGrant, OAuthErrorBody, RefreshGrant, TokenGrant, TokenResponse},
};

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// The two token endpoint exchanges the session lifecycle depends on.
///
/// Implementations perform exactly one network exchange per call and never
/// touch session state; classification of failures into terminal and
/// transient is their responsibility.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchanges a one-time authorization grant for the initial credential.
    async fn exchange_code(&self, grant: &AuthorizationGrant) -> Result<TokenGrant, ExchangeError>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError>;
}

/// Whether a failed exchange may succeed if simply tried again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Terminal,
    Transient,
}

/// Classifies a non-success token endpoint status.
///
/// 5xx, 429 and 408 are provider-side or throttling conditions; any other
/// 4xx (notably 400 `invalid_grant` and 401 `invalid_client`) means the
/// presented grant will never be accepted.
pub fn classify_status(status: StatusCode) -> FailureClass {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FailureClass::Transient
    } else {
        FailureClass::Terminal
    }
}

#[derive(Debug)]
enum EndpointFailure {
    Transport(String),
    Status { status: StatusCode, detail: String },
    Malformed(String),
}

impl EndpointFailure {
    fn class(&self) -> FailureClass {
        match self {
            EndpointFailure::Transport(_) | EndpointFailure::Malformed(_) => FailureClass::Transient,
            EndpointFailure::Status { status, .. } => classify_status(*status),
        }
    }

    fn message(&self) -> String {
        match self {
            EndpointFailure::Transport(msg) | EndpointFailure::Malformed(msg) => msg.clone(),
            EndpointFailure::Status { status, detail } => format!("{status}: {detail}"),
        }
    }
}

/// Token endpoint client for Spotify's accounts service.
#[derive(Debug, Clone)]
pub struct SpotifyTokenClient {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl SpotifyTokenClient {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(SpotifyTokenClient {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(
            settings.token_url.clone(),
            settings.client_id.clone(),
            settings.client_secret.clone(),
            settings.http_timeout,
        )
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, EndpointFailure> {
        let mut request = self.http.post(&self.token_url).form(form);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "request failed" };
            EndpointFailure::Transport(format!("token endpoint {kind}: {e}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EndpointFailure::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{} ({})", err.error, desc),
                    None => err.error,
                },
                Err(_) => body.chars().take(200).collect(),
            };
            return Err(EndpointFailure::Status { status, detail });
        }

        serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| EndpointFailure::Malformed(format!("unreadable token response: {e}")))
    }

    async fn request_code_grant(
        &self,
        grant: &AuthorizationGrant,
    ) -> Result<TokenGrant, EndpointFailure> {
        let response = self
            .post_form(&[
                ("grant_type", "authorization_code"),
                ("client_id", &self.client_id),
                ("code", &grant.code),
                ("code_verifier", &grant.code_verifier),
                ("redirect_uri", &grant.redirect_uri),
            ])
            .await?;
        let access_token = require_access_token(&response)?;
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EndpointFailure::Malformed("token response without refresh_token".into()))?;

        Ok(TokenGrant {
            access_token,
            refresh_token,
            scope: response.scope,
            expires_in_secs: response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
        })
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshGrant, EndpointFailure> {
        let response = self
            .post_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
            ])
            .await?;
        let access_token = require_access_token(&response)?;

        Ok(RefreshGrant {
            access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            scope: response.scope,
            expires_in_secs: response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
        })
    }
}

fn require_access_token(response: &TokenResponse) -> Result<String, EndpointFailure> {
    response
        .access_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EndpointFailure::Malformed("token response without access_token".into()))
}

#[async_trait]
impl TokenExchange for SpotifyTokenClient {
    async fn exchange_code(&self, grant: &AuthorizationGrant) -> Result<TokenGrant, ExchangeError> {
        self.request_code_grant(grant).await.map_err(|failure| {
            warn!(error = %failure.message(), "authorization code exchange failed");
            match failure.class() {
                FailureClass::Terminal => ExchangeError::Rejected(failure.message()),
                FailureClass::Transient => ExchangeError::Unavailable(failure.message()),
            }
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError> {
        self.request_refresh(refresh_token).await.map_err(|failure| {
            debug!(error = %failure.message(), class = ?failure.class(), "refresh exchange failed");
            match failure.class() {
                FailureClass::Terminal => RefreshError::Rejected(failure.message()),
                FailureClass::Transient => RefreshError::Unavailable(failure.message()),
            }
        })
    }
}

/// Builds the provider authorization URL for the PKCE code flow.
pub fn authorize_url(
    settings: &Settings,
    code_challenge: &str,
    state: &str,
) -> Result<String, ConfigError> {
    let url = url::Url::parse_with_params(
        &settings.auth_url,
        &[
            ("client_id", settings.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", settings.scope.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| ConfigError::Invalid {
        key: "SPOTIFY_API_AUTH_URL",
        reason: e.to_string(),
    })?;

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), FailureClass::Transient);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), FailureClass::Transient);
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), FailureClass::Transient);
        assert_eq!(classify_status(StatusCode::REQUEST_TIMEOUT), FailureClass::Transient);
    }

    #[test]
    fn client_errors_are_terminal() {
        assert_eq!(classify_status(StatusCode::BAD_REQUEST), FailureClass::Terminal);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), FailureClass::Terminal);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), FailureClass::Terminal);
    }

    #[test]
    fn authorize_url_carries_pkce_parameters() {
        let settings = Settings::from_lookup(|key| match key {
            "SERVER_ADDRESS" => Some("127.0.0.1:8888".into()),
            "SPOTIFY_API_AUTH_CLIENT_ID" => Some("client-1".into()),
            "SPOTIFY_API_REDIRECT_URI" => Some("http://127.0.0.1:8888/callback".into()),
            "SPOTIFY_API_AUTH_SCOPE" => Some("streaming user-read-email".into()),
            _ => None,
        })
        .unwrap();

        let url = authorize_url(&settings, "challenge", "state-xyz").unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "S256".into())));
        assert!(pairs.contains(&("scope".into(), "streaming user-read-email".into())));
        assert!(pairs.contains(&("state".into(), "state-xyz".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://127.0.0.1:8888/callback".into()
        )));
    }
}
