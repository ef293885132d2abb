use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned after a successful login; the token is kept client-side
/// (secure storage on mobile).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    pub is_admin: bool,
    pub is_email_verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    pub is_admin: bool,
    pub is_email_verified: bool,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            surname: user.surname,
            phone: user.phone,
            email: user.email,
            is_admin: user.is_admin,
            is_email_verified: user.is_email_verified,
        }
    }
}

/// Email and phone are deliberately not updatable here; changing either
/// should re-trigger verification, which is not supported yet.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub verification_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reset_password_code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub push_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
