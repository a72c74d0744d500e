//! One-shot banner messages carried across a redirect in a signed cookie.
//!
//! Cookie value: `hex(level "\n" message) "." hex(hmac_sha256(payload))`.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "flash";
pub const CLEAR_COOKIE: &str = "flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Danger,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Danger => "danger",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "danger" => Some(Level::Danger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Signing key derived from the configured secret.
#[derive(Clone)]
pub struct FlashKey(Arc<Vec<u8>>);

impl FlashKey {
    pub fn new(secret: &str) -> Self {
        Self(Arc::new(secret.as_bytes().to_vec()))
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.0).ok()
    }

    /// `Set-Cookie` value carrying `flash`.
    pub fn set_cookie(&self, flash: &Flash) -> Option<HeaderValue> {
        let payload = format!("{}\n{}", flash.level.as_str(), flash.message);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();
        let cookie = format!(
            "{COOKIE_NAME}={}.{}; Path=/; HttpOnly; SameSite=Lax",
            hex::encode(payload.as_bytes()),
            hex::encode(tag)
        );
        HeaderValue::from_str(&cookie).ok()
    }

    /// The flash in the request's cookies, if present and correctly signed.
    pub fn read(&self, headers: &HeaderMap) -> Option<Flash> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .find_map(|pair| pair.trim().strip_prefix("flash="))?;
        self.decode(value)
    }

    fn decode(&self, value: &str) -> Option<Flash> {
        let (payload_hex, tag_hex) = value.split_once('.')?;
        let payload = hex::decode(payload_hex).ok()?;
        let tag = hex::decode(tag_hex).ok()?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        if mac.verify_slice(&tag).is_err() {
            tracing::debug!("discarding flash cookie with a bad signature");
            return None;
        }

        let text = String::from_utf8(payload).ok()?;
        let (level, message) = text.split_once('\n')?;
        Some(Flash::new(Level::parse(level)?, message))
    }
}
