use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, PasswordResetRequest, RegisterRequest},
        jwt::{JwtKeys, TokenPair},
        password::{hash_password, verify_password},
    },
    error::AppError,
    mail::{password_reset_email, verification_email},
    state::AppState,
    users::{
        repo::DuplicateEmail,
        repo_types::{NewUser, User},
    },
    verification::{
        repo_types::{NewVerificationToken, TokenType},
        token,
    },
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password too short".into()));
    }
    Ok(())
}

async fn user_by_email(state: &AppState, email: &str) -> Result<User, AppError> {
    state
        .users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Stores a fresh token for `user` and returns the raw UUID to mail out.
async fn issue_verification_token(
    state: &AppState,
    user: &User,
    token_type: TokenType,
) -> Result<Uuid, AppError> {
    let ttl_minutes = match token_type {
        TokenType::Registration => state.config.tokens.registration_ttl_minutes,
        TokenType::ResetPassword => state.config.tokens.reset_ttl_minutes,
    };
    let raw = token::generate();
    state
        .tokens
        .create(NewVerificationToken {
            user_id: user.id,
            token_type,
            token_digest: token::digest(&raw),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes),
        })
        .await?;
    Ok(raw)
}

async fn send_activation_link(state: &AppState, user: &User) -> Result<(), AppError> {
    let raw = issue_verification_token(state, user, TokenType::Registration).await?;
    let link = format!("{}/api/auth/register/confirm?token={}", state.config.public_url, raw);
    if let Err(e) = state
        .mailer
        .send(verification_email(&user.email, &user.name, &link))
        .await
    {
        error!(error = ?e, user_id = %user.id, "sending activation mail failed");
    }
    Ok(())
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(&payload.login);
    let name = payload.name.trim().to_string();

    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    validate_password(&payload.password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e.downcast_ref::<DuplicateEmail>() {
            Some(dup) => {
                warn!(email = %dup.0, "email registered concurrently");
                AppError::Conflict("Email already registered".into())
            }
            None => AppError::Internal(e),
        })?;

    send_activation_link(state, &user).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Activates the account behind a registration link. `Ok(false)` means the
/// token is unknown, expired or already used.
pub async fn confirm_registration(state: &AppState, raw: &str) -> Result<bool, AppError> {
    let raw = token::parse(raw)?;
    let Some(vt) = state.tokens.find_by_digest(&token::digest(&raw)).await? else {
        warn!("unknown registration token");
        return Ok(false);
    };

    if vt.token_type != TokenType::Registration || !vt.matches(&raw) {
        warn!(token_id = %vt.id, "token is not a registration token");
        return Ok(false);
    }
    if vt.is_expired(OffsetDateTime::now_utc()) {
        warn!(
            token_id = %vt.id,
            user_id = %vt.user_id,
            issued_at = %vt.created_at,
            "registration token expired"
        );
        return Ok(false);
    }
    if vt.activated || vt.is_consumed() {
        warn!(token_id = %vt.id, user_id = %vt.user_id, "registration token already used");
        return Ok(false);
    }

    // The token is only spent once the account is enabled, so a failed
    // update leaves the link usable.
    state.users.set_enabled(vt.user_id, true).await?;
    if !state.tokens.mark_activated(vt.id).await? {
        warn!(token_id = %vt.id, user_id = %vt.user_id, "registration token already used");
        return Ok(false);
    }
    state.tokens.consume(vt.id).await?;
    info!(user_id = %vt.user_id, "account confirmed");
    Ok(true)
}

/// Mails a new activation link. `Ok(false)` when the account is already active.
pub async fn resend_activation(state: &AppState, email: &str) -> Result<bool, AppError> {
    let user = user_by_email(state, email).await?;
    if user.enabled {
        return Ok(false);
    }
    send_activation_link(state, &user).await?;
    Ok(true)
}

/// Whether the account behind `email` has been confirmed through any of its links.
pub async fn is_email_confirmed(state: &AppState, email: &str) -> Result<bool, AppError> {
    Ok(user_by_email(state, email).await?.enabled)
}

pub async fn login(state: &AppState, payload: LoginRequest) -> Result<TokenPair, AppError> {
    let email = normalize_email(&payload.login);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    if !user.enabled {
        warn!(user_id = %user.id, "login on disabled account");
        return Err(AppError::AccountDisabled);
    }

    let pair = JwtKeys::new(&state.config.jwt).issue_pair(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(pair)
}

/// Exchanges the refresh cookie for a new pair. A missing cookie never yields tokens.
pub async fn refresh(state: &AppState, refresh_token: Option<String>) -> Result<TokenPair, AppError> {
    let Some(refresh_token) = refresh_token else {
        return Err(AppError::Unauthorized("Refresh token is missing.".into()));
    };

    let keys = JwtKeys::new(&state.config.jwt);
    let claims = keys.verify_refresh(&refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::Unauthorized("Invalid refresh token.".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if !user.enabled {
        return Err(AppError::AccountDisabled);
    }

    let pair = keys.issue_pair(user.id)?;
    info!(user_id = %user.id, "tokens refreshed");
    Ok(pair)
}

pub async fn request_password_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let user = user_by_email(state, email).await?;
    if !user.enabled {
        return Err(AppError::Conflict(AppError::AccountDisabled.to_string()));
    }

    let raw = issue_verification_token(state, &user, TokenType::ResetPassword).await?;
    let link = format!(
        "{}/api/auth/password/reset/confirmEmail?token={}",
        state.config.public_url, raw
    );
    if let Err(e) = state
        .mailer
        .send(password_reset_email(&user.email, &user.name, &link))
        .await
    {
        error!(error = ?e, user_id = %user.id, "sending password reset mail failed");
    }
    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// Confirms the reset link. Only the user's latest reset token counts.
pub async fn confirm_password_reset_email(state: &AppState, raw: &str) -> Result<bool, AppError> {
    let raw = token::parse(raw)?;
    let Some(vt) = state.tokens.find_by_digest(&token::digest(&raw)).await? else {
        warn!("unknown password reset token");
        return Ok(false);
    };
    if vt.token_type != TokenType::ResetPassword || !vt.matches(&raw) {
        return Ok(false);
    }

    let latest = state
        .tokens
        .find_latest(vt.user_id, TokenType::ResetPassword)
        .await?;
    if latest.map(|t| t.id) != Some(vt.id) {
        warn!(token_id = %vt.id, user_id = %vt.user_id, "superseded password reset token");
        return Ok(false);
    }
    if vt.is_consumed() || vt.is_expired(OffsetDateTime::now_utc()) {
        return Ok(false);
    }

    let activated = state.tokens.mark_activated(vt.id).await?;
    if activated {
        info!(user_id = %vt.user_id, "password reset confirmed");
    }
    Ok(activated)
}

pub async fn reset_password(state: &AppState, payload: PasswordResetRequest) -> Result<(), AppError> {
    let user = user_by_email(state, &payload.email).await?;
    validate_password(&payload.password)?;

    let not_confirmed = || AppError::BadRequest("Password reset was not confirmed.".into());
    let vt = state
        .tokens
        .find_latest(user.id, TokenType::ResetPassword)
        .await?
        .ok_or_else(not_confirmed)?;
    if !vt.activated || vt.is_consumed() || vt.is_expired(OffsetDateTime::now_utc()) {
        return Err(not_confirmed());
    }
    if !state.tokens.consume(vt.id).await? {
        return Err(not_confirmed());
    }

    let hash = hash_password(&payload.password)?;
    state.users.update_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}

pub async fn profile(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

pub async fn profile_for_token(state: &AppState, access_token: &str) -> Result<User, AppError> {
    let claims = JwtKeys::new(&state.config.jwt)
        .verify_access(access_token)
        .map_err(|e| {
            warn!(error = %e, "profile token rejected");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;
    profile(state, claims.sub).await
}
