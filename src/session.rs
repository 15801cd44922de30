//! Signed cookie sessions and flash messages.
//!
//! Cookies carry `base64(json):signature`, where the signature is an
//! HMAC-SHA256 of the encoded value keyed with `app.session_secret`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::{Engine, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use std::convert::Infallible;
use tracing::{debug, warn};

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

const FLASH_MAX_AGE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid secret key")]
    InvalidKey,
    #[error("Failed to encode cookie: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, SessionError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SessionError::InvalidKey)?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

/// Returns the unsigned value if the signature matches.
pub fn verify_signed_cookie<'a>(secret: &str, signed_value: &'a str) -> Option<&'a str> {
    if let Some((value, signature_b64)) = signed_value.split_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        if mac.verify_slice(&signature).is_ok() {
            return Some(value);
        }
    }
    None
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

fn encode_signed<T: Serialize>(secret: &str, data: &T) -> Result<String, SessionError> {
    let json = serde_json::to_vec(data)?;
    create_signed_cookie(secret, &general_purpose::URL_SAFE_NO_PAD.encode(json))
}

fn decode_signed<T: DeserializeOwned>(secret: &str, signed_value: &str) -> Option<T> {
    let value = verify_signed_cookie(secret, signed_value)?;
    let json = general_purpose::URL_SAFE_NO_PAD.decode(value).ok()?;
    serde_json::from_slice(&json).ok()
}

fn cookie_header(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name, value, max_age_secs
    )
}

pub fn clear_cookie(name: &str) -> String {
    cookie_header(name, "", 0)
}

/// Per-visitor state carried in the `session` cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub gallery_seed: Option<u64>,
    #[serde(default)]
    pub issued_at: i64,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            issued_at: Utc::now().timestamp(),
            ..Self::default()
        }
    }

    /// Read the session from the request cookies. Missing, forged or expired
    /// cookies yield `None`.
    pub fn from_headers(headers: &HeaderMap, secret: &str, ttl_hours: u64) -> Option<Self> {
        let raw = get_cookie_value(headers, SESSION_COOKIE)?;
        let Some(session) = decode_signed::<SessionData>(secret, &raw) else {
            debug!("Ignoring session cookie with bad signature");
            return None;
        };

        let age = Utc::now().timestamp() - session.issued_at;
        if age < 0 || age > (ttl_hours as i64).saturating_mul(3600) {
            debug!("Session expired after {} seconds", age);
            return None;
        }

        Some(session)
    }

    /// `Set-Cookie` value persisting this session.
    pub fn to_cookie(&self, secret: &str, ttl_hours: u64) -> Result<String, SessionError> {
        let value = encode_signed(secret, self)?;
        Ok(cookie_header(
            SESSION_COOKIE,
            &value,
            (ttl_hours as i64).saturating_mul(3600),
        ))
    }
}

/// Session extractor. Always succeeds; visitors without a valid cookie get a
/// fresh anonymous session that is only persisted if a handler writes it.
#[derive(Debug, Clone)]
pub struct Session(pub SessionData);

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app = &state.config.app;
        let data = SessionData::from_headers(&parts.headers, &app.session_secret, app.session_ttl_hours)
            .unwrap_or_else(SessionData::new);
        Ok(Session(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashLevel::Danger,
            message: message.into(),
        }
    }
}

pub fn read_flashes(headers: &HeaderMap, secret: &str) -> Vec<Flash> {
    get_cookie_value(headers, FLASH_COOKIE)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| decode_signed(secret, &raw))
        .unwrap_or_default()
}

pub fn flash_cookie(secret: &str, flashes: &[Flash]) -> Result<String, SessionError> {
    let value = encode_signed(secret, &flashes)?;
    Ok(cookie_header(FLASH_COOKIE, &value, FLASH_MAX_AGE_SECS))
}

/// 303 redirect that sets every cookie in `cookies`.
pub fn redirect_with_cookies(to: &str, cookies: Vec<String>) -> Response {
    let headers = AppendHeaders(cookies.into_iter().map(|cookie| (SET_COOKIE, cookie)));
    (headers, Redirect::to(to)).into_response()
}

/// 303 redirect carrying flash messages for the next page.
pub fn flash_redirect(secret: &str, to: &str, flashes: &[Flash]) -> Response {
    match flash_cookie(secret, flashes) {
        Ok(cookie) => redirect_with_cookies(to, vec![cookie]),
        Err(e) => {
            warn!("Dropping flash messages: {}", e);
            Redirect::to(to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_str(cookie).unwrap());
        headers
    }

    /// Strip attributes from a `Set-Cookie` value, leaving `name=value`.
    fn request_cookie(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn signed_cookie_rejects_tampering() {
        let signed = create_signed_cookie(SECRET, "hello").unwrap();
        assert_eq!(verify_signed_cookie(SECRET, &signed), Some("hello"));
        assert_eq!(verify_signed_cookie("other-secret", &signed), None);

        let forged = signed.replacen("hello", "hellp", 1);
        assert_eq!(verify_signed_cookie(SECRET, &forged), None);
        assert_eq!(verify_signed_cookie(SECRET, "no-signature"), None);
    }

    #[test]
    fn get_cookie_value_finds_named_cookie() {
        let headers = headers_with_cookie("a=1; session=abc:def ; b=2");
        assert_eq!(get_cookie_value(&headers, "session").as_deref(), Some("abc:def"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn session_survives_cookie_round_trip() {
        let session = SessionData {
            admin: true,
            gallery_seed: Some(4242),
            issued_at: Utc::now().timestamp(),
        };
        let cookie = session.to_cookie(SECRET, 24).unwrap();
        assert!(cookie.contains("Max-Age=86400"));

        let headers = headers_with_cookie(&request_cookie(&cookie));
        assert_eq!(SessionData::from_headers(&headers, SECRET, 24), Some(session));
        assert_eq!(SessionData::from_headers(&headers, "wrong", 24), None);
    }

    #[test]
    fn expired_session_is_ignored() {
        let session = SessionData {
            admin: true,
            gallery_seed: None,
            issued_at: Utc::now().timestamp() - 3 * 3600,
        };
        let cookie = session.to_cookie(SECRET, 2).unwrap();
        let headers = headers_with_cookie(&request_cookie(&cookie));
        assert_eq!(SessionData::from_headers(&headers, SECRET, 2), None);
    }

    #[test]
    fn flashes_are_read_back_in_order() {
        let flashes = vec![Flash::success("Uploaded 2 images"), Flash::danger("1 images failed")];
        let cookie = flash_cookie(SECRET, &flashes).unwrap();
        let headers = headers_with_cookie(&request_cookie(&cookie));
        assert_eq!(read_flashes(&headers, SECRET), flashes);

        let cleared = headers_with_cookie(&request_cookie(&clear_cookie(FLASH_COOKIE)));
        assert!(read_flashes(&cleared, SECRET).is_empty());
    }

    #[test]
    fn flash_levels_serialize_as_css_classes() {
        let json = serde_json::to_string(&[Flash::success("ok"), Flash::danger("no")]).unwrap();
        assert!(json.contains(r#""category":"success""#));
        assert!(json.contains(r#""category":"danger""#));
    }
}
