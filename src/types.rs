use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils::redact;

/// Raw body of a successful token endpoint response.
///
/// Both the `authorization_code` and the `refresh_token` grants answer with
/// this shape. Every field is optional on the wire so that a partial response
/// can be classified instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
}

/// OAuth error body returned by the token endpoint on 4xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// One-time authorization grant produced by the browser redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

/// Pending PKCE state between `/login` and `/callback`.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub state: String,
}

/// Initial credential material returned by the authorization-code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: Option<String>,
    pub expires_in_secs: u64,
}

/// Material returned by a refresh exchange.
///
/// `refresh_token` is `None` when the provider did not rotate it.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in_secs: u64,
}

/// Output of one refresh cycle with the expiry already resolved to an instant.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialFragment {
    pub access_token: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Valid,
    Refreshing,
    Error,
}

/// Why a credential entered the terminal `error` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialFailure {
    /// The provider refused the refresh token.
    RefreshRejected { reason: String },
    /// There was no refresh token to present.
    MissingRefreshToken,
}

/// The bearer material of one authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: Option<String>,
    /// Epoch milliseconds after which `access_token` is invalid.
    pub expires_at: i64,
    pub status: CredentialStatus,
    #[serde(default)]
    pub last_error: Option<CredentialFailure>,
}

impl Credential {
    /// Builds the first credential of a session. `issued_at` is the epoch
    /// millisecond instant the exchange was started.
    pub fn from_grant(grant: TokenGrant, issued_at: i64) -> Self {
        Credential {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            scope: grant.scope,
            expires_at: expiry_after(issued_at, grant.expires_in_secs),
            status: CredentialStatus::Valid,
            last_error: None,
        }
    }

    /// True when the token expires within `margin_ms` of `now_ms`, or already has.
    pub fn expires_within(&self, now_ms: i64, margin_ms: i64) -> bool {
        self.expires_at.saturating_sub(now_ms) <= margin_ms
    }

    pub fn is_failed(&self) -> bool {
        self.status == CredentialStatus::Error
    }

    pub fn with_status(&self, status: CredentialStatus) -> Self {
        Credential {
            status,
            ..self.clone()
        }
    }

    /// Merges a refresh result. A fragment without a refresh token keeps the
    /// current one; the same goes for scope.
    pub fn apply(&self, fragment: CredentialFragment) -> Self {
        Credential {
            access_token: fragment.access_token,
            refresh_token: fragment
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            scope: fragment.scope.or_else(|| self.scope.clone()),
            expires_at: fragment.expires_at,
            status: CredentialStatus::Valid,
            last_error: None,
        }
    }

    /// Terminal form of this credential: bearer material wiped, reason kept.
    pub fn into_failed(self, failure: CredentialFailure) -> Self {
        Credential {
            access_token: String::new(),
            refresh_token: String::new(),
            scope: self.scope,
            expires_at: self.expires_at,
            status: CredentialStatus::Error,
            last_error: Some(failure),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("scope", &self.scope)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

impl fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshGrant")
            .field("access_token", &redact(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .field("scope", &self.scope)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

impl fmt::Debug for CredentialFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialFragment")
            .field("access_token", &redact(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .finish()
    }
}

pub(crate) fn expiry_after(issued_at: i64, lifetime_secs: u64) -> i64 {
    let lifetime_ms = i64::try_from(lifetime_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    issued_at.saturating_add(lifetime_ms)
}

/// Session state the presentational layer is allowed to branch on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub is_session_expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    SignedOut,
    SigningIn,
    Authenticated { refreshing: bool },
    Failed,
}

impl SessionPhase {
    pub fn state(self) -> SessionState {
        match self {
            SessionPhase::SignedOut | SessionPhase::SigningIn => SessionState::default(),
            SessionPhase::Authenticated { .. } => SessionState {
                is_authenticated: true,
                is_session_expired: false,
            },
            SessionPhase::Failed => SessionState {
                is_authenticated: true,
                is_session_expired: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub owner: Option<PlaylistOwner>,
    #[serde(default)]
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferPlaybackRequest {
    pub device_ids: Vec<String>,
    pub play: bool,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub name: String,
    pub owner: String,
    pub tracks: u64,
    pub id: String,
}

impl From<&Playlist> for PlaylistTableRow {
    fn from(playlist: &Playlist) -> Self {
        PlaylistTableRow {
            name: playlist.name.clone(),
            owner: playlist
                .owner
                .as_ref()
                .map(|o| o.display_name.clone().unwrap_or_else(|| o.id.clone()))
                .unwrap_or_default(),
            tracks: playlist.tracks.as_ref().map(|t| t.total).unwrap_or(0),
            id: playlist.id.clone(),
        }
    }
}
