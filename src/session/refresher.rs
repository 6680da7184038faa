use std::sync::Arc;

use tracing::debug;

use crate::{
    clock::Clock,
    error::RefreshError,
    spotify::auth::TokenExchange,
    types::{CredentialFragment, expiry_after},
    utils::redact,
};

/// Performs one refresh exchange and resolves the provider-reported lifetime
/// into an absolute expiry.
///
/// Stateless apart from its collaborators; it never writes the credential.
#[derive(Clone)]
pub struct TokenRefresher {
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
}

impl TokenRefresher {
    pub fn new(exchange: Arc<dyn TokenExchange>, clock: Arc<dyn Clock>) -> Self {
        TokenRefresher { exchange, clock }
    }

    /// Exchanges `refresh_token` for a new access token.
    ///
    /// The expiry is measured from the moment the request is sent, so network
    /// latency shortens rather than lengthens the assumed lifetime.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::Rejected`] when the refresh token is empty or refused.
    /// - [`RefreshError::Unavailable`] for transport failures, timeouts and
    ///   provider outages.
    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialFragment, RefreshError> {
        if refresh_token.is_empty() {
            return Err(RefreshError::Rejected("no refresh token available".into()));
        }

        let issued_at = self.clock.now_millis();
        debug!(refresh_token = %redact(refresh_token), "exchanging refresh token");
        let grant = self.exchange.refresh(refresh_token).await?;

        Ok(CredentialFragment {
            expires_at: expiry_after(issued_at, grant.expires_in_secs),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            scope: grant.scope,
        })
    }
}
