use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Opaque value echoed back by the provider on `/callback`.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

/// Loggable form of a secret: the first four characters of long tokens only.
pub fn redact(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    if token.chars().count() <= 8 {
        return "…".to_string();
    }
    let head: String = token.chars().take(4).collect();
    format!("{head}…")
}

/// Spotify ids are base62; anything else never reaches a request path.
pub fn is_spotify_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn format_remaining(millis: i64) -> String {
    if millis <= 0 {
        return "expired".to_string();
    }
    let secs = millis / 1000;
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
