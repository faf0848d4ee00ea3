use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::conflict_on_unique;
use crate::auth::Role;
use crate::error::{Error, Result};

/// Account as exposed over the API; the password hash never leaves this module.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid, username: String, name: String, email: String, password_hash: String,
    phone: Option<String>, role: String, created_at: DateTime<Utc>,
}

impl UserRow {
    fn split(self) -> Result<(User, String)> {
        let user = User {
            id: self.id, username: self.username, name: self.name, email: self.email, phone: self.phone,
            role: self.role.parse()?, created_at: self.created_at,
        };
        Ok((user, self.password_hash))
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
}

const COLUMNS: &str = "id, username, name, email, password_hash, phone, role, created_at";

pub async fn insert(pool: &PgPool, new: NewUser<'_>) -> Result<User> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (id, username, name, email, password_hash, phone, role, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'user', NOW(), NOW()) RETURNING {}", COLUMNS))
        .bind(Uuid::now_v7()).bind(new.username).bind(new.name).bind(new.email.to_lowercase()).bind(new.password_hash).bind(new.phone)
        .fetch_one(pool).await
        .map_err(|e| conflict_on_unique(e, "Username or email already registered"))?;
    Ok(row.split()?.0)
}

/// Looks an active account up by username or email, returning its stored hash.
pub async fn find_credentials(pool: &PgPool, login: &str) -> Result<Option<(User, String)>> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE (username = $1 OR email = LOWER($1)) AND NOT is_deleted", COLUMNS))
        .bind(login.trim()).fetch_optional(pool).await?
        .map(UserRow::split).transpose()
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<User> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1 AND NOT is_deleted", COLUMNS))
        .bind(id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("User"))?;
    Ok(row.split()?.0)
}
