use std::sync::LazyLock;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::jwt::{ACCESS_TOKEN_MINUTES, Claims, decode_token, encode_token};
use crate::auth::{password, token};
use crate::config::RegistrationMode;
use crate::db;
use crate::db::users::NewUser;
use crate::error::{AppError, is_unique_violation};
use crate::models::User;
use crate::models::notification::USER_ACTIVATION;
use crate::state::SharedState;

const REFRESH_TOKEN_DAYS: i64 = 7;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("valid username regex"));

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ResendActivationRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn auth_cookies(access_token: &str, refresh_token: &str) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();

    let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
        .path("/api/v1/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/api/v1/auth")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

/// The refresh token comes from the cookie, or from a JSON body for non-browser clients.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Option<String> {
    if let Some(cookie) = jar.get("refresh_token") {
        return Some(cookie.value().to_string());
    }
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()
        .and_then(|req| req.refresh_token)
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::validation(
            "username",
            "invalid_username",
            "Username may contain only letters, digits and @/./+/-/_ characters",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::validation(
            "email",
            "invalid_email",
            "Enter a valid email address",
        ));
    }
    Ok(())
}

/// Issue an access token and persist a fresh refresh token for the user.
async fn issue_tokens(
    state: &SharedState,
    user: &User,
) -> Result<(CookieJar, AuthResponse), AppError> {
    let claims = Claims::new(user.id, user.is_staff);
    let access_token =
        encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = token::generate();
    db::refresh_tokens::create(
        &state.pool,
        user.id,
        &token::hash(&refresh),
        Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
    )
    .await?;

    let jar = auth_cookies(&access_token, &refresh);
    Ok((
        jar,
        AuthResponse {
            access_token,
            refresh_token: refresh,
        },
    ))
}

async fn queue_activation_email(state: &SharedState, user_id: Uuid) {
    if let Err(e) =
        db::notifications::enqueue(&state.pool, USER_ACTIVATION, &json!({ "user_id": user_id }))
            .await
    {
        tracing::warn!(user_id = %user_id, "Failed to queue activation email: {e}");
    }
}

/// The bootstrap user is always created active and staff. When activation is
/// required every later account starts inactive and receives no tokens.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let email = req.email.trim().to_lowercase();
    validate_username(&req.username)?;
    validate_email(&email)?;
    password::validate(&req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock serializes the bootstrap check against concurrent registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 && state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your system administrator.".to_string(),
        ));
    }

    let bootstrap = count == 0;
    let user = db::users::create(
        &mut *tx,
        &NewUser {
            username: &req.username,
            email: &email,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            password_hash: &pw_hash,
            is_staff: bootstrap,
            is_active: bootstrap || !state.config.require_activation,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A user with that username or email already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        is_staff = user.is_staff,
        is_active = user.is_active,
        "user registered"
    );

    if !user.is_active {
        queue_activation_email(&state, user.id).await;
        return Ok((StatusCode::CREATED, Json(user)).into_response());
    }

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, jar, Json(body)).into_response())
}

pub async fn activate(
    State(state): State<SharedState>,
    Json(req): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.pool.begin().await?;

    let user_id = db::activation_tokens::consume(&mut *tx, &token::hash(&req.token))
        .await?
        .ok_or_else(|| {
            AppError::validation("token", "invalid_token", "Invalid or expired activation token")
        })?;

    if !db::users::activate(&mut *tx, user_id).await? {
        return Err(AppError::Forbidden("Stale token for given user.".to_string()));
    }
    db::activation_tokens::delete_all_for_user(&mut *tx, user_id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, "user activated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resend_activation(
    State(state): State<SharedState>,
    Json(req): Json<ResendActivationRequest>,
) -> Result<StatusCode, AppError> {
    let no_account = || {
        AppError::validation(
            "email",
            "no_inactive_user",
            "No inactive account is registered with this email",
        )
    };

    if !state.config.require_activation {
        return Err(no_account());
    }

    let user = db::users::find_inactive_by_email(&state.pool, req.email.trim())
        .await?
        .ok_or_else(no_account)?;

    queue_activation_email(&state, user.id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Check an access token's signature and expiry.
pub async fn verify(
    State(state): State<SharedState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    decode_token(&req.token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Token is invalid or expired".to_string()))?;
    Ok(Json(json!({})))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.login_limiter.check(&req.username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let Some(user) = db::users::find_by_username(&state.pool, &req.username).await? else {
        state.login_limiter.record_failure(&req.username);
        return Err(invalid());
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid || !user.is_active {
        state.login_limiter.record_failure(&req.username);
        return Err(invalid());
    }

    state.login_limiter.reset(&req.username);

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, Json(body)))
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let refresh_value = presented_refresh_token(&jar, &body)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &token::hash(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    if stored.used || !db::refresh_tokens::consume(&state.pool, stored.id).await? {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::delete_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, Json(body)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(refresh_value) = presented_refresh_token(&jar, &body) {
        db::refresh_tokens::delete_by_hash(&state.pool, &token::hash(&refresh_value)).await?;
    }

    Ok((
        clear_auth_cookies(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}
