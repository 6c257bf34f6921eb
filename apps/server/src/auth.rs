use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Tokens issued slightly in the future (clock skew) are still accepted.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// secret_key = HMAC-SHA256("StaffSession", password)
fn signing_key(password: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(b"StaffSession").ok()?;
    mac.update(password.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

fn session_mac(password: &str, issued_at: i64) -> Option<HmacSha256> {
    let key = signing_key(password)?;
    let mut mac = HmacSha256::new_from_slice(&key).ok()?;
    mac.update(format!("iat={}", issued_at).as_bytes());
    Some(mac)
}

/// Constant-time comparison of a submitted password against the shared one.
pub fn password_matches(candidate: &str, password: &str) -> bool {
    let Some(expected) = signing_key(password) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(b"StaffSession") else {
        return false;
    };
    mac.update(candidate.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Issues a staff session token of the form `iat=<unix>&sig=<hex>`.
pub fn issue_token(password: &str, now: DateTime<Utc>) -> Option<String> {
    let issued_at = now.timestamp();
    let sig = hex::encode(session_mac(password, issued_at)?.finalize().into_bytes());
    Some(format!("iat={}&sig={}", issued_at, sig))
}

/// Validates a staff session token. Returns false when the signature does not
/// match or the token is older than `max_age`.
pub fn verify_token(token: &str, password: &str, max_age: TimeDelta, now: DateTime<Utc>) -> bool {
    let params: BTreeMap<String, String> = url::form_urlencoded::parse(token.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let (Some(iat), Some(sig)) = (params.get("iat"), params.get("sig")) else {
        return false;
    };
    let Ok(issued_at) = iat.parse::<i64>() else {
        return false;
    };

    let age = now.timestamp() - issued_at;
    if age > max_age.num_seconds() || age < -MAX_CLOCK_SKEW_SECS {
        tracing::warn!("staff token expired: iat={}, age={}s", issued_at, age);
        return false;
    }

    let Ok(sig_bytes) = hex::decode(sig) else {
        return false;
    };
    match session_mac(password, issued_at) {
        Some(mac) => mac.verify_slice(&sig_bytes).is_ok(),
        None => false,
    }
}

/// Validates the Authorization header.
/// Header format: `Staff <token>`
pub fn staff_from_header(
    auth_header: &str,
    password: &str,
    max_age: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    match auth_header.strip_prefix("Staff ") {
        Some(token) => verify_token(token.trim(), password, max_age, now),
        None => false,
    }
}
