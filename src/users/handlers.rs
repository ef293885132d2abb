use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        principal::Principal,
        tokens::TokenKeys,
    },
    email::{password_reset_email_body, verification_email_body},
    error::AppError,
    state::AppState,
    users::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, ProfileResponse,
            PushTokenRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
            VerifyEmailRequest,
        },
        repo::User,
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Single-use numeric credential for email verification and password reset.
pub(crate) fn six_digit_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

const CODE_TTL_MINUTES: i64 = 10;

fn code_expiry() -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::minutes(CODE_TTL_MINUTES)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(AppError::validation("Invalid email address."));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::validation("This email address is already registered."));
    }

    let hash = hash_password(&payload.password)?;
    let verification_code = six_digit_code();

    let user = User::create(
        &state.db,
        &payload.name,
        &payload.surname,
        &payload.phone,
        &payload.email,
        &hash,
        &verification_code,
        code_expiry(),
    )
    .await?;

    // The registration stands even if the mail relay is down; the user can
    // request another code through forgot-password-style support flows.
    let body = verification_email_body(&verification_code);
    if let Err(e) = state
        .mailer
        .send(&user.email, "Verify your email address", &body)
        .await
    {
        warn!(error = %e, email = %user.email, "verification email dispatch failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Verification code sent. Please check your email.",
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::auth("Invalid email or password."))?;

    let password_ok = verify_password(&payload.password, &user.password_hash)?;
    if !password_ok || !user.is_email_verified {
        warn!(email = %payload.email, verified = user.is_email_verified, "login rejected");
        return Err(AppError::auth("Invalid email or password."));
    }

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign_user(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        id: user.id,
        name: user.name,
        surname: user.surname,
        phone: user.phone,
        email: user.email,
        is_admin: user.is_admin,
        is_email_verified: user.is_email_verified,
    }))
}

/// Stateless for the mobile client; it discards the bearer token locally.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully."))
}

#[instrument(skip_all)]
pub async fn get_profile(Principal(user): Principal) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(user))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Principal(user): Principal,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let password_hash = match payload.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.name.as_deref(),
        payload.surname.as_deref(),
        password_hash.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("User not found."))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ProfileResponse::from(updated)))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();

    match User::verify_email(&state.db, &email, &payload.verification_code).await? {
        Some(user) => {
            info!(user_id = %user.id, "email verified");
            Ok(Json(MessageResponse::new("Email verified successfully!")))
        }
        None => Err(AppError::validation(
            "Invalid or expired verification code!",
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;

    let code = six_digit_code();
    User::set_reset_code(&state.db, user.id, &code, code_expiry()).await?;

    let body = password_reset_email_body(&code);
    if let Err(e) = state
        .mailer
        .send(&user.email, "Reset your password", &body)
        .await
    {
        warn!(error = %e, email = %user.email, "reset email dispatch failed");
    }

    info!(user_id = %user.id, "password reset code issued");
    Ok(Json(MessageResponse::new(
        "A password reset code was sent to your email address.",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.email.is_empty()
        || payload.reset_password_code.is_empty()
        || payload.new_password.is_empty()
    {
        return Err(AppError::not_found(
            "Missing information. Please fill in all fields.",
        ));
    }
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_reset_code(&state.db, &email, &payload.reset_password_code)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid user or expired reset code."))?;

    if verify_password(&payload.new_password, &user.password_hash)? {
        return Err(AppError::validation(
            "Your new password cannot be the same as your old password.",
        ));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let replaced =
        User::reset_password(&state.db, &email, &payload.reset_password_code, &new_hash).await?;
    if !replaced {
        // Code was consumed between the lookup and the write.
        return Err(AppError::not_found("Invalid user or expired reset code."));
    }

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now sign in with your new password.",
    )))
}

#[instrument(skip(state, payload))]
pub async fn update_push_token(
    State(state): State<AppState>,
    Principal(user): Principal,
    Json(payload): Json<PushTokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let updated = User::set_push_token(&state.db, user.id, &payload.push_token).await?;
    if !updated {
        return Err(AppError::not_found("User not found."));
    }
    Ok(Json(MessageResponse::new("Push token updated successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_digit_codes_are_six_digits() {
        for _ in 0..100 {
            let code = six_digit_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn code_expiry_is_ten_minutes_out() {
        let expiry = code_expiry();
        let delta = expiry - OffsetDateTime::now_utc();
        assert!(delta > Duration::minutes(9));
        assert!(delta <= Duration::minutes(10));
    }
}
