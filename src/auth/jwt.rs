use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::state::AppState;

/// Admin tokens are short-lived, api keys live for two years.
const ADMIN_TTL_SECONDS: i64 = 300;
const API_KEY_TTL_SECONDS: i64 = 2 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Admin,
    ApiKey,
}

impl TokenKind {
    fn subject(self) -> &'static str {
        match self {
            TokenKind::Access => "access-token",
            TokenKind::Refresh => "refresh-token",
            TokenKind::Admin => "admin-token",
            TokenKind::ApiKey => "api-key",
        }
    }

    fn audience(self) -> &'static [&'static str] {
        match self {
            TokenKind::Admin => &["admin"],
            _ => &["customer", "admin"],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token")]
    Signing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserClaims {
    pub id: Uuid,
    pub role_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<UserClaims>,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signing/verification keys for the four token kinds. Each kind has its own
/// secret, so a token issued for one purpose never verifies as another.
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    admin: KeyPair,
    api_key: KeyPair,
    issuer: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            access_secret,
            refresh_secret,
            admin_secret,
            api_key_secret,
            issuer,
            access_ttl_seconds,
            refresh_ttl_seconds,
        } = state.config.jwt.clone();
        Self {
            access: KeyPair::from_secret(&access_secret),
            refresh: KeyPair::from_secret(&refresh_secret),
            admin: KeyPair::from_secret(&admin_secret),
            api_key: KeyPair::from_secret(&api_key_secret),
            issuer,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }
}

impl JwtKeys {
    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::Admin => &self.admin,
            TokenKind::ApiKey => &self.api_key,
        }
    }

    fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
            TokenKind::Admin => ADMIN_TTL_SECONDS,
            TokenKind::ApiKey => API_KEY_TTL_SECONDS,
        }
    }

    fn sign(
        &self,
        kind: TokenKind,
        user: Option<&UserClaims>,
        expires_at: Option<i64>,
    ) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: kind.subject().to_string(),
            aud: kind.audience().iter().map(|s| s.to_string()).collect(),
            exp: expires_at.unwrap_or(now + self.ttl_seconds(kind)),
            nbf: now,
            iat: now,
            claims: user.cloned(),
        };
        let token = encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(|_| TokenError::Signing)?;
        debug!(kind = ?kind, "token signed");
        Ok(token)
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        // HS256 only; any other algorithm family is rejected outright.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_audience(kind.audience());
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;
        if data.claims.sub != kind.subject() {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    pub fn sign_access(&self, user: &UserClaims) -> Result<String, TokenError> {
        self.sign(TokenKind::Access, Some(user), None)
    }

    pub fn sign_refresh(&self, user: &UserClaims) -> Result<String, TokenError> {
        self.sign(TokenKind::Refresh, Some(user), None)
    }

    pub fn sign_admin(&self) -> Result<String, TokenError> {
        self.sign(TokenKind::Admin, None, None)
    }

    pub fn sign_api_key(&self) -> Result<String, TokenError> {
        self.sign(TokenKind::ApiKey, None, None)
    }

    /// Reissue a refresh token keeping the expiry of the one it replaces.
    /// Rotation therefore never extends the total session lifetime.
    pub fn repeat_refresh(&self, user: &UserClaims, expires_at: i64) -> Result<String, TokenError> {
        self.sign(TokenKind::Refresh, Some(user), Some(expires_at))
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }

    pub fn verify_admin(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Admin, token)
    }

    pub fn verify_api_key(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::ApiKey, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Built straight from secrets; no pool or runtime involved, so these
    // tests stay synchronous.
    fn make_keys() -> JwtKeys {
        JwtKeys {
            access: KeyPair::from_secret("test-access-secret"),
            refresh: KeyPair::from_secret("test-refresh-secret"),
            admin: KeyPair::from_secret("test-admin-secret"),
            api_key: KeyPair::from_secret("test-api-key-secret"),
            issuer: "storefront-api".into(),
            access_ttl_seconds: 24 * 60 * 60,
            refresh_ttl_seconds: 7 * 24 * 60 * 60,
        }
    }

    fn user() -> UserClaims {
        UserClaims {
            id: Uuid::new_v4(),
            role_id: 1,
        }
    }

    #[test]
    fn sign_and_verify_each_kind() {
        let keys = make_keys();
        let u = user();

        let access = keys.sign_access(&u).unwrap();
        let claims = keys.verify_access(&access).unwrap();
        assert_eq!(claims.sub, "access-token");
        assert_eq!(claims.claims, Some(u.clone()));

        let refresh = keys.sign_refresh(&u).unwrap();
        let claims = keys.verify_refresh(&refresh).unwrap();
        assert_eq!(claims.sub, "refresh-token");

        let admin = keys.sign_admin().unwrap();
        let claims = keys.verify_admin(&admin).unwrap();
        assert_eq!(claims.sub, "admin-token");
        assert_eq!(claims.claims, None);
        assert_eq!(claims.aud, vec!["admin".to_string()]);

        let api_key = keys.sign_api_key().unwrap();
        let claims = keys.verify_api_key(&api_key).unwrap();
        assert_eq!(claims.sub, "api-key");
    }

    #[test]
    fn kinds_never_cross_verify() {
        let keys = make_keys();
        let u = user();
        let tokens = [
            (TokenKind::Access, keys.sign_access(&u).unwrap()),
            (TokenKind::Refresh, keys.sign_refresh(&u).unwrap()),
            (TokenKind::Admin, keys.sign_admin().unwrap()),
            (TokenKind::ApiKey, keys.sign_api_key().unwrap()),
        ];
        let kinds = [
            TokenKind::Access,
            TokenKind::Refresh,
            TokenKind::Admin,
            TokenKind::ApiKey,
        ];
        for (signed_as, token) in &tokens {
            for verify_as in &kinds {
                let result = keys.verify(*verify_as, token);
                if signed_as == verify_as {
                    assert!(result.is_ok(), "{signed_as:?} should verify as itself");
                } else {
                    assert_eq!(
                        result.unwrap_err(),
                        TokenError::Malformed,
                        "{signed_as:?} must not verify as {verify_as:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn expired_and_malformed_are_distinct() {
        let keys = make_keys();
        let past = OffsetDateTime::now_utc().unix_timestamp() - 3600;
        let expired = keys.repeat_refresh(&user(), past).unwrap();
        assert_eq!(
            keys.verify_refresh(&expired).unwrap_err(),
            TokenError::Expired
        );
        assert_eq!(
            keys.verify_refresh("not.a.token").unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn repeat_preserves_expiry_instant() {
        let keys = make_keys();
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 1234;
        let token = keys.repeat_refresh(&user(), exp).unwrap();
        let claims = keys.verify_refresh(&token).unwrap();
        assert_eq!(claims.exp, exp);
    }
}
