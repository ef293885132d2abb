use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned after admin login. The token also travels in the http-only
/// cookie; the body copy is for clients that want to inspect expiry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthResponse {
    pub admin_token: String,
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub token: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub feedback_message: String,
}
