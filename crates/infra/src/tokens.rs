use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};

/// Validity of an account setup link.
pub const SETUP_TOKEN_TTL_DAYS: i64 = 14;

/// Random url-safe token for invite and setup links.
pub fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 24]>())
}

pub fn setup_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(SETUP_TOKEN_TTL_DAYS)
}
