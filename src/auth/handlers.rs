use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        cookie::{clear_refresh_cookie, read_refresh_cookie, refresh_cookie},
        dto::{
            AccessTokenRequest, EmailRequest, LoginRequest, LoginResponse, PasswordResetRequest,
            ProfileResponse, RegisterRequest, TokenQuery, UserCreatedResponse,
        },
        pages, services,
    },
    error::{AppError, MessageResponse},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/register/confirm", get(confirm_registration))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/token/refresh", post(refresh))
        .route("/auth/password/forget", post(forget_password))
        .route("/auth/password/reset", post(reset_password))
        .route("/auth/password/reset/confirmEmail", get(confirm_reset_email))
        .route("/auth/activate", post(resend_activation))
        .route("/auth/email/confirmed", post(email_confirmed))
        .route("/auth/me", post(me))
        .route("/auth/cron", get(cron))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = services::register(&state, payload).await?;
    let location = format!("/api/users/{}", user.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(UserCreatedResponse {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, query))]
pub async fn confirm_registration(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Html<String>, AppError> {
    let raw = query.token.unwrap_or_default();
    let page = if services::confirm_registration(&state, &raw).await? {
        pages::account_confirmed()
    } else {
        pages::account_not_confirmed()
    };
    Ok(Html(page))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = services::login(&state, payload).await?;
    Ok((
        [(header::SET_COOKIE, refresh_cookie(&pair.refresh_token))],
        Json(LoginResponse {
            token: pair.access_token,
        }),
    ))
}

#[instrument]
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(MessageResponse::new("Logged out.")),
    )
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let pair = services::refresh(&state, read_refresh_cookie(&headers)).await?;
    Ok((
        [(header::SET_COOKIE, refresh_cookie(&pair.refresh_token))],
        Json(LoginResponse {
            token: pair.access_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forget_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(MessageResponse::new(
        "Password reset link was sent to your e-mail.",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::reset_password(&state, payload).await?;
    Ok(Json(MessageResponse::new("Password changed successfully.")))
}

#[instrument(skip(state, query))]
pub async fn confirm_reset_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Html<String>, AppError> {
    let raw = query.token.unwrap_or_default();
    let page = if services::confirm_password_reset_email(&state, &raw).await? {
        pages::reset_email_confirmed()
    } else {
        pages::reset_email_not_confirmed()
    };
    Ok(Html(page))
}

#[instrument(skip(state, payload))]
pub async fn resend_activation(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim();
    let message = if services::resend_activation(&state, email).await? {
        format!("Activation link sent to {email} successfully.")
    } else {
        format!("User is already active with email: {email}")
    };
    Ok(Json(MessageResponse::new(message)))
}

#[instrument(skip(state, payload))]
pub async fn email_confirmed(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    if services::is_email_confirmed(&state, &payload.email).await? {
        Ok((StatusCode::OK, Json(MessageResponse::new("email activated."))))
    } else {
        Ok((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new("email not activated.")),
        ))
    }
}

#[instrument(skip(state, payload))]
pub async fn me(
    State(state): State<AppState>,
    Json(payload): Json<AccessTokenRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = services::profile_for_token(&state, &payload.token).await?;
    Ok(Json(ProfileResponse::from(user)))
}

/// Keep-alive target for an external scheduler.
#[instrument]
pub async fn cron() -> Json<MessageResponse> {
    info!("cron ping received");
    Json(MessageResponse::new("Application is working."))
}
