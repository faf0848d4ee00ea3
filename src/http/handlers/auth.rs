use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{self, AuthUser, IssuedToken};
use crate::db::users::{self, NewUser, User};
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(alias = "no_hp")]
    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub user: User,
    #[serde(flatten)]
    pub token: IssuedToken,
}

pub async fn register(State(s): State<AppState>, ValidJson(r): ValidJson<RegisterRequest>) -> Result<impl axum::response::IntoResponse> {
    let password_hash = auth::hash_password(&r.password)?;
    let user = users::insert(&s.db, NewUser {
        username: r.username.trim(), name: r.name.trim(), email: r.email.trim(), password_hash: &password_hash, phone: r.phone.as_deref(),
    }).await?;
    let token = s.tokens.issue(user.id, user.role)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(created("Registration successful", Session { user, token }))
}

pub async fn login(State(s): State<AppState>, ValidJson(r): ValidJson<LoginRequest>) -> Result<ApiResponse<Session>> {
    let invalid = || Error::Unauthorized("Invalid credentials".into());
    let (user, hash) = users::find_credentials(&s.db, &r.login).await?.ok_or_else(invalid)?;
    if !auth::verify_password(&hash, &r.password)? {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(invalid());
    }
    let token = s.tokens.issue(user.id, user.role)?;
    Ok(ok("Login successful", Session { user, token }))
}

pub async fn me(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<User>> {
    Ok(ok("Profile retrieved", users::find_by_id(&s.db, user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rules() {
        let mut r: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "sari", "name": "Sari", "email": "sari@example.com", "password": "rahasia123", "no_hp": "081234567890"
        })).unwrap();
        assert!(r.validate().is_ok());
        assert_eq!(r.phone.as_deref(), Some("081234567890"));
        r.password = "short".into();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_login_accepts_email_field() {
        let r: LoginRequest = serde_json::from_value(serde_json::json!({"email": "sari@example.com", "password": "x"})).unwrap();
        assert_eq!(r.login, "sari@example.com");
    }
}
