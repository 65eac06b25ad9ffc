use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo_types::User,
};
use crate::{
    access::Identity,
    config::AdminSeed,
    error::{AppError, AppResult},
};

const MAX_USERNAME_LEN: usize = 80;
const MAX_EMAIL_LEN: usize = 120;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && !username.chars().any(char::is_whitespace)
}

/// Trims and lowercases what needs it, then validates the registration form.
pub(crate) fn normalize_registration(mut req: RegisterRequest) -> AppResult<RegisterRequest> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    if !is_valid_username(&req.username) {
        return Err(AppError::invalid("Invalid username"));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::invalid("Invalid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid("Password too short"));
    }
    Ok(req)
}

pub async fn register(db: &PgPool, req: RegisterRequest) -> AppResult<User> {
    let req = normalize_registration(req)?;
    let hash = hash_password(&req.password)?;

    let mut tx = db.begin().await?;
    if let Some(existing) = User::find_conflicting(&mut *tx, &req.username, &req.email).await? {
        let msg = if existing.username == req.username {
            "Username already taken"
        } else {
            "Email already registered"
        };
        warn!(username = %req.username, "registration conflict");
        return Err(AppError::Conflict(msg.into()));
    }
    // A concurrent registration still trips the unique constraints and maps to Conflict.
    let user = User::create(&mut *tx, &req.username, &req.email, &hash, false).await?;
    tx.commit().await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(db: &PgPool, keys: &JwtKeys, req: LoginRequest) -> AppResult<AuthResponse> {
    let username = req.username.trim();
    let invalid = || AppError::Unauthorized("Invalid username or password".into());

    let user = match User::find_by_username(db, username).await? {
        Some(u) => u,
        None => {
            warn!(%username, "login unknown username");
            return Err(invalid());
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let user = User::touch_last_login(db, user.id).await?;
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

/// Exchanges a refresh token for a new access token. The user must still exist.
pub async fn refresh(db: &PgPool, keys: &JwtKeys, refresh_token: &str) -> AppResult<String> {
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid or expired refresh token".into())
    })?;

    if User::find_by_id(db, claims.sub).await?.is_none() {
        return Err(AppError::Unauthorized("User not found".into()));
    }

    Ok(keys.sign_access(claims.sub)?)
}

pub async fn current_user(db: &PgPool, user_id: Uuid) -> AppResult<User> {
    User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn change_password(
    db: &PgPool,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> AppResult<()> {
    let user = current_user(db, user_id).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        warn!(%user_id, "change password with wrong current password");
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid("Password too short"));
    }

    let hash = hash_password(&req.new_password)?;
    User::set_password_hash(db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(())
}

/// Resolves the caller's role. A token for a deleted account is unauthorized.
pub async fn load_identity<'e>(
    db: impl sqlx::PgExecutor<'e>,
    user_id: Uuid,
) -> AppResult<Identity> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Identity {
        user_id: user.id,
        is_admin: user.is_admin,
    })
}

/// Creates the configured admin account when the database has no users yet.
pub async fn seed_admin(db: &PgPool, seed: &AdminSeed) -> anyhow::Result<Option<User>> {
    let mut tx = db.begin().await?;
    if User::count(&mut *tx).await? > 0 {
        return Ok(None);
    }
    let hash = hash_password(&seed.password)?;
    let user = User::create(
        &mut *tx,
        seed.username.trim(),
        &seed.email.trim().to_lowercase(),
        &hash,
        true,
    )
    .await?;
    tx.commit().await?;
    info!(user_id = %user.id, username = %user.username, "bootstrap admin created");
    Ok(Some(user))
}
