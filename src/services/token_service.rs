// src/services/token_service.rs

//! Signed bearer tokens for session authentication.
//!
//! A token is `base64url(payload) . base64url(HMAC-SHA256(secret, payload))`
//! where the payload is `<user_id>:<expiry_unix_secs>`. Verification checks
//! the MAC before trusting anything in the payload, then the expiry.

use base64::prelude::*;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Issues a token for `user_id` valid for `ttl_secs` from now.
pub fn issue_token(secret: &str, user_id: Uuid, ttl_secs: i64) -> Result<String, AppError> {
  issue_token_at(secret, user_id, Utc::now().timestamp() + ttl_secs)
}

/// Verifies signature and expiry, returning the embedded user id.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, AppError> {
  verify_token_at(secret, token, Utc::now().timestamp())
}

fn issue_token_at(secret: &str, user_id: Uuid, expires_at: i64) -> Result<String, AppError> {
  let payload = format!("{}:{}", user_id, expires_at);
  let mac = sign(secret, payload.as_bytes())?;
  Ok(format!(
    "{}.{}",
    BASE64_URL_SAFE_NO_PAD.encode(payload.as_bytes()),
    BASE64_URL_SAFE_NO_PAD.encode(mac)
  ))
}

fn verify_token_at(secret: &str, token: &str, now: i64) -> Result<Uuid, AppError> {
  let (payload_b64, mac_b64) = token
    .split_once('.')
    .ok_or_else(|| AppError::Auth("Malformed session token.".to_string()))?;

  let payload = BASE64_URL_SAFE_NO_PAD
    .decode(payload_b64)
    .map_err(|_| AppError::Auth("Malformed session token.".to_string()))?;
  let claimed_mac = BASE64_URL_SAFE_NO_PAD
    .decode(mac_b64)
    .map_err(|_| AppError::Auth("Malformed session token.".to_string()))?;

  // Constant-time comparison via Mac::verify_slice.
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
  mac.update(&payload);
  mac
    .verify_slice(&claimed_mac)
    .map_err(|_| AppError::Auth("Invalid session token.".to_string()))?;

  let payload_str =
    String::from_utf8(payload).map_err(|_| AppError::Auth("Malformed session token.".to_string()))?;
  let (user_id_str, expiry_str) = payload_str
    .split_once(':')
    .ok_or_else(|| AppError::Auth("Malformed session token.".to_string()))?;

  let expires_at = expiry_str
    .parse::<i64>()
    .map_err(|_| AppError::Auth("Malformed session token.".to_string()))?;
  if now >= expires_at {
    return Err(AppError::Auth("Session token has expired.".to_string()));
  }

  Uuid::parse_str(user_id_str).map_err(|_| AppError::Auth("Malformed session token.".to_string()))
}

fn sign(secret: &str, payload: &[u8]) -> Result<Vec<u8>, AppError> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
  mac.update(payload);
  Ok(mac.finalize().into_bytes().to_vec())
}
