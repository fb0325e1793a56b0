//! Password change and forgotten-password handlers.
//!
//! The forgotten-password request answers the same way whether or not the
//! account exists, so it cannot be used to discover usernames.

use crate::error::{query_rejection, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use galleon_core::models::User;
use galleon_core::AppError;
use galleon_plugins::basic_auth::send_fp_verification_email;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub const FP_SENT_MESSAGE: &str =
    "If that account exists and has a verified email address, an email with instructions \
     on how to change your password has been sent.";

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Username or email address
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 5, max = 1024, message = "Password must be at least 5 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub old_password: String,
    #[validate(length(min = 5, max = 1024, message = "Password must be at least 5 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub username: String,
}

/// Send a password reset link to the account's verified address.
#[tracing::instrument(skip(state, request))]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let auth = state.auth()?;
    let login = request.username.trim();

    match auth.get_user(login).await? {
        Some(user) if user.email_verified => {
            // Delivery failures are logged, not reported, to keep the answer uniform
            if let Err(e) = send_fp_verification_email(
                &user,
                &state.fp_signer,
                &state.urlgen,
                &state.mailer,
                &state.config.site_name,
            )
            .await
            {
                tracing::error!(user_id = user.id, error = %e, "Failed to send password reset email");
            }
        }
        Some(user) => {
            tracing::info!(user_id = user.id, "Password reset requested for unverified email, not sending");
        }
        None => {
            auth.fake_login_attempt().await;
            tracing::debug!("Password reset requested for unknown account");
        }
    }

    Ok(MessageResponse::new(FP_SENT_MESSAGE))
}

/// Resolve a reset token to a verified account
async fn user_from_token(state: &AppState, token: &str) -> Result<User, AppError> {
    let user_id: i64 = state
        .fp_signer
        .loads(token, state.config.fp_token_max_age_secs)
        .map_err(|e| AppError::InvalidToken(e.to_string()))?;

    match state.users.get_by_id(user_id).await? {
        Some(user) if user.email_verified => Ok(user),
        Some(_) => Err(AppError::InvalidToken(format!(
            "user {} has no verified email",
            user_id
        ))),
        None => Err(AppError::InvalidToken(format!("user {} not found", user_id))),
    }
}

/// Check a reset token before the new password is chosen.
#[tracing::instrument(skip_all)]
pub async fn verify_forgot_password_form(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<VerifyTokenResponse>, HttpAppError> {
    let Query(query) = query.map_err(query_rejection)?;
    let user = user_from_token(&state, &query.token).await?;
    Ok(Json(VerifyTokenResponse {
        username: user.username,
    }))
}

/// Set a new password using a reset token.
#[tracing::instrument(skip_all)]
pub async fn verify_forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    request.validate()?;
    let auth = state.auth()?;
    let user = user_from_token(&state, &request.token).await?;

    let pw_hash = auth
        .gen_password_hash(&request.password, state.extra_salt())
        .await?;
    state.users.update_pw_hash(user.id, &pw_hash).await?;

    tracing::info!(user_id = user.id, "Password reset through emailed token");
    Ok(MessageResponse::new(
        "You can now log in using your new password.",
    ))
}

/// Change the password of an account, given its current password.
#[tracing::instrument(skip(state, request), fields(username = %request.username))]
pub async fn change_pass(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    request.validate()?;
    let auth = state.auth()?;

    let Some(user) = auth.get_user(&request.username).await? else {
        auth.fake_login_attempt().await;
        return Err(AppError::Unauthorized("Wrong password".to_string()).into());
    };

    let matches = auth
        .check_password(
            &request.old_password,
            user.pw_hash.as_deref(),
            state.extra_salt(),
        )
        .await?;
    match matches {
        Some(true) => {}
        Some(false) => return Err(AppError::Unauthorized("Wrong password".to_string()).into()),
        None => {
            auth.fake_login_attempt().await;
            return Err(AppError::Unauthorized("Wrong password".to_string()).into());
        }
    }

    let pw_hash = auth
        .gen_password_hash(&request.new_password, state.extra_salt())
        .await?;
    state.users.update_pw_hash(user.id, &pw_hash).await?;

    tracing::info!(user_id = user.id, "Password changed");
    Ok(MessageResponse::new(
        "Your password was changed successfully",
    ))
}
