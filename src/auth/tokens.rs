use axum::{
    extract::FromRef,
    http::{header::InvalidHeaderValue, HeaderValue},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

pub const ADMIN_COOKIE_NAME: &str = "adminToken";

/// Claims carried by a mobile-client user token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Claims carried by an admin-panel token. The `is_admin` flag is part of
/// the signed payload, not inferred from transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: Uuid,
    pub is_admin: bool,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys for both token kinds. The secrets are
/// independent, so a token of one kind can never verify as the other.
#[derive(Clone)]
pub struct TokenKeys {
    user_encoding: EncodingKey,
    user_decoding: DecodingKey,
    admin_encoding: EncodingKey,
    admin_decoding: DecodingKey,
    user_ttl: Duration,
    admin_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        TokenKeys::new(&state.config.jwt)
    }
}

impl TokenKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            user_encoding: EncodingKey::from_secret(cfg.user_secret.as_bytes()),
            user_decoding: DecodingKey::from_secret(cfg.user_secret.as_bytes()),
            admin_encoding: EncodingKey::from_secret(cfg.admin_secret.as_bytes()),
            admin_decoding: DecodingKey::from_secret(cfg.admin_secret.as_bytes()),
            user_ttl: Duration::days(cfg.user_ttl_days),
            admin_ttl: Duration::hours(cfg.admin_ttl_hours),
        }
    }

    /// Issue a user token, valid for 30 days by default.
    pub fn sign_user(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = UserClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + self.user_ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.user_encoding)?;
        debug!(user_id = %user_id, "user token signed");
        Ok(token)
    }

    /// Issue an admin token, valid for 24 hours by default.
    pub fn sign_admin(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = AdminClaims {
            sub: user_id,
            is_admin: true,
            iat: now.unix_timestamp() as usize,
            exp: (now + self.admin_ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.admin_encoding)?;
        debug!(user_id = %user_id, "admin token signed");
        Ok(token)
    }

    pub fn verify_user(&self, token: &str) -> anyhow::Result<UserClaims> {
        let data = decode::<UserClaims>(token, &self.user_decoding, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn verify_admin(&self, token: &str) -> anyhow::Result<AdminClaims> {
        let data = decode::<AdminClaims>(token, &self.admin_decoding, &Validation::default())?;
        if !data.claims.is_admin {
            anyhow::bail!("token does not carry the admin claim");
        }
        Ok(data.claims)
    }
}

/// Build the `Set-Cookie` value carrying the admin token: http-only,
/// same-site strict, one day retention, `Secure` outside development.
pub fn admin_cookie(token: &str, production: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{ADMIN_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        60 * 60 * 24
    );
    if production {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_admin_cookie(production: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{ADMIN_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if production {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn make_keys() -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            user_secret: "user-secret".into(),
            admin_secret: "admin-secret".into(),
            user_ttl_days: 30,
            admin_ttl_hours: 24,
        })
    }

    #[test]
    fn sign_and_verify_user_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_user(user_id).expect("sign user");
        let claims = keys.verify_user(&token).expect("verify user");
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn sign_and_verify_admin_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_admin(user_id).expect("sign admin");
        let claims = keys.verify_admin(&token).expect("verify admin");
        assert_eq!(claims.sub, user_id);
        assert!(claims.is_admin);
    }

    #[test]
    fn user_token_rejected_on_admin_path() {
        let keys = make_keys();
        let token = keys.sign_user(Uuid::new_v4()).expect("sign user");
        assert!(keys.verify_admin(&token).is_err());
    }

    #[test]
    fn admin_token_rejected_on_user_path() {
        let keys = make_keys();
        let token = keys.sign_admin(Uuid::new_v4()).expect("sign admin");
        assert!(keys.verify_user(&token).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        let keys = make_keys();
        assert!(keys.verify_user("not.a.token").is_err());
        assert!(keys.verify_admin("not.a.token").is_err());
    }

    #[test]
    fn admin_cookie_flags() {
        let dev = admin_cookie("abc", false).unwrap();
        let dev = dev.to_str().unwrap();
        assert!(dev.starts_with("adminToken=abc;"));
        assert!(dev.contains("HttpOnly"));
        assert!(dev.contains("SameSite=Strict"));
        assert!(dev.contains("Max-Age=86400"));
        assert!(!dev.contains("Secure"));

        let prod = admin_cookie("abc", true).unwrap();
        assert!(prod.to_str().unwrap().contains("Secure"));

        let cleared = clear_admin_cookie(false).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
