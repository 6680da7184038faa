//! # Session Module
//!
//! Owns the OAuth access-token lifecycle: the one-time authorization grant
//! exchange, the stored credential, expiry detection, refresh, and the typed
//! failure states every consumer of a token sees.
//!
//! ```text
//! SessionAuthority  (sign-in, expiry check, single-flight refresh, derived state)
//!     ├── CredentialStore  (atomic snapshot / compare-and-set holder)
//!     └── TokenRefresher   (one refresh exchange -> credential fragment)
//!             ↓
//!     TokenExchange (provider token endpoint)
//! ```
//!
//! [`CredentialCache`] mirrors the credential to disk for the CLI and server.

mod authority;
mod cache;
mod refresher;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use authority::DEFAULT_REFRESH_MARGIN;
pub use authority::SessionAuthority;
pub use authority::SessionAuthorityBuilder;
pub use cache::CredentialCache;
pub use refresher::TokenRefresher;
pub use store::CredentialStore;
