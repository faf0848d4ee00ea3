//! Authentication
//!
//! Passwords are stored as Argon2 PHC strings. Sessions are stateless HS256
//! bearer tokens carrying the user id and role.

pub mod extract;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::aggregates::UnknownStatus;
use crate::error::{Error, Result};
pub use extract::{AdminUser, AuthUser};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { User, Admin, SuperAdmin }

impl Role {
    pub fn as_str(self) -> &'static str {
        match self { Self::User => "user", Self::Admin => "admin", Self::SuperAdmin => "superadmin" }
    }
    pub fn is_admin(self) -> bool { matches!(self, Self::Admin | Self::SuperAdmin) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::SuperAdmin),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[instrument(skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() { return Err(Error::Validation("password must not be empty".into())); }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default().hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// `Ok(false)` for a wrong password; `Err` only for an unreadable stored hash.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| Error::Internal(format!("stored hash unreadable: {}", e)))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Signs and checks bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<IssuedToken> {
        let now = Utc::now();
        let claims = Claims { sub: user_id, role, iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))?;
        Ok(IssuedToken { access_token: token, token_type: "bearer", expires_in: self.ttl.num_seconds() })
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthorized(format!("invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("rahasia-123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "rahasia-123").unwrap());
        assert!(!verify_password(&hash, "salah").unwrap());
        assert!(verify_password("not-a-hash", "x").is_err());
    }

    #[test]
    fn test_token_carries_role() {
        let keys = TokenKeys::new("test-secret", 60);
        let user = Uuid::new_v4();
        let issued = keys.issue(user, Role::Admin).unwrap();
        assert_eq!(issued.expires_in, 3600);
        let claims = keys.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, user);
        assert!(claims.role.is_admin());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = TokenKeys::new("one", 60).issue(Uuid::new_v4(), Role::User).unwrap();
        assert!(matches!(TokenKeys::new("two", 60).verify(&issued.access_token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("superadmin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!(!Role::User.is_admin());
        assert!("root".parse::<Role>().is_err());
    }
}
