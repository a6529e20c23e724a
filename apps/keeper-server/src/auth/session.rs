// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed session tokens carried in a cookie.
//!
//! Token format: `<user_id>.<expires_unix>.<mac>` where `mac` is
//! HMAC-SHA256 over `<user_id>.<expires_unix>`, base64url without padding.
//! Verification is constant-time. Tokens are never logged.

use std::fmt;

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "keeper_session";

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionManager {
    key: Vec<u8>,
    ttl_secs: i64,
    secure_cookie: bool,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("key", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

impl SessionManager {
    /// Use a configured signing secret.
    pub fn new(key: impl Into<Vec<u8>>, ttl_secs: i64, secure_cookie: bool) -> Result<Self, AuthError> {
        let key = key.into();
        if key.is_empty() {
            return Err(AuthError::InternalError("session key must not be empty".into()));
        }
        Ok(Self {
            key,
            ttl_secs,
            secure_cookie,
        })
    }

    /// Use a random per-process signing secret. Sessions do not survive a
    /// restart.
    pub fn ephemeral(ttl_secs: i64, secure_cookie: bool) -> Result<Self, AuthError> {
        let mut key = vec![0u8; 32];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| AuthError::InternalError("random session key".into()))?;
        Self::new(key, ttl_secs, secure_cookie)
    }

    /// Issue a token for `user_id`, valid for the configured TTL.
    pub fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    fn issue_at(&self, user_id: &str, now: i64) -> Result<String, AuthError> {
        let claims = format!("{user_id}.{}", now + self.ttl_secs);
        let tag = self.mac(&claims)?.finalize().into_bytes();
        Ok(format!("{claims}.{}", Base64UrlUnpadded::encode_string(&tag)))
    }

    /// Verify a token and return the user id it was issued to.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<String, AuthError> {
        let (claims, tag_b64) = token.rsplit_once('.').ok_or(AuthError::MalformedSession)?;
        let (user_id, expires) = claims.rsplit_once('.').ok_or(AuthError::MalformedSession)?;
        if user_id.is_empty() {
            return Err(AuthError::MalformedSession);
        }
        let expires: i64 = expires.parse().map_err(|_| AuthError::MalformedSession)?;
        let tag = Base64UrlUnpadded::decode_vec(tag_b64).map_err(|_| AuthError::MalformedSession)?;

        self.mac(claims)?
            .verify_slice(&tag)
            .map_err(|_| AuthError::InvalidSignature)?;

        if expires <= now {
            return Err(AuthError::SessionExpired);
        }
        Ok(user_id.to_string())
    }

    /// Session cookie carrying `token`, expiring with it.
    pub fn cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_owned()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(cookie::time::Duration::seconds(self.ttl_secs))
            .secure(self.secure_cookie)
            .build()
    }

    fn mac(&self, claims: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| AuthError::InternalError("session key rejected".into()))?;
        mac.update(claims.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(b"session-test-key".to_vec(), 3600, false).unwrap()
    }

    const USER: &str = "7f0c1e9a-7a2c-4a39-b36a-4b8d2d3f1e11";

    #[test]
    fn issued_token_verifies() {
        let sessions = manager();
        let token = sessions.issue(USER).unwrap();
        assert_eq!(sessions.verify(&token).unwrap(), USER);
    }

    #[test]
    fn expired_token_is_rejected() {
        let sessions = manager();
        let token = sessions.issue_at(USER, 1_000).unwrap();
        assert!(sessions.verify_at(&token, 4_599).is_ok());
        assert!(matches!(
            sessions.verify_at(&token, 4_600),
            Err(AuthError::SessionExpired)
        ));
    }

    #[test]
    fn forged_user_id_is_rejected() {
        let sessions = manager();
        let token = sessions.issue(USER).unwrap();
        let forged = token.replacen(USER, "00000000-0000-4000-8000-000000000000", 1);
        assert!(matches!(
            sessions.verify(&forged),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn extended_expiry_is_rejected() {
        let sessions = manager();
        let token = sessions.issue_at(USER, 1_000).unwrap();
        let forged = token.replacen(".4600.", ".9999999999.", 1);
        assert!(matches!(
            sessions.verify_at(&forged, 5_000),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn other_key_is_rejected() {
        let token = manager().issue(USER).unwrap();
        let other = SessionManager::new(b"different-key".to_vec(), 3600, false).unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let sessions = manager();
        for token in ["", "abc", "a.b", ".123.AAAA", "u.notanumber.AAAA", "u.123.!!!"] {
            assert!(
                matches!(sessions.verify(token), Err(AuthError::MalformedSession)),
                "{token:?}"
            );
        }
    }

    #[test]
    fn cookie_attributes() {
        let header = manager().cookie("tok").to_string();
        let cookie = Cookie::parse(header.as_str()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(3600)));
        assert_eq!(cookie.secure(), None);

        let secure = SessionManager::new(b"k".to_vec(), 60, true).unwrap();
        assert_eq!(secure.cookie("tok").secure(), Some(true));
    }

    #[test]
    fn debug_hides_key() {
        assert!(!format!("{:?}", manager()).contains("session-test-key"));
    }
}
