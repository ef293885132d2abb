use axum::{
    extract::{FromRef, Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    admin::dto::{
        AdminAuthResponse, AdminLoginRequest, AdminProfileResponse, FeedbackRequest,
        SendNotificationRequest,
    },
    auth::{
        password::verify_password,
        principal::AdminPrincipal,
        tokens::{admin_cookie, clear_admin_cookie, TokenKeys},
    },
    error::{parse_id, AppError},
    issues::repo::{Issue, IssueStatus},
    push::is_expo_push_token,
    state::AppState,
    users::{dto::MessageResponse, repo::User},
};

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct IssueActionResponse {
    pub message: String,
    pub issue: Issue,
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<AdminLoginRequest>,
) -> Result<(HeaderMap, Json<AdminAuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::auth("Invalid email or password."))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, "admin login invalid password");
        return Err(AppError::auth("Invalid email or password."));
    }

    if !user.is_admin {
        warn!(user_id = %user.id, "non-admin attempted admin login");
        return Err(AppError::forbidden("Access denied. Admins only."));
    }

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign_admin(user.id)?;

    let mut headers = HeaderMap::new();
    let cookie = admin_cookie(&token, state.config.env.is_production())
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(SET_COOKIE, cookie);

    info!(user_id = %user.id, "admin logged in");
    Ok((
        headers,
        Json(AdminAuthResponse {
            admin_token: token,
            id: user.id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            phone: user.phone,
            is_admin: user.is_admin,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let mut headers = HeaderMap::new();
    let cookie = clear_admin_cookie(state.config.env.is_production())
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(SET_COOKIE, cookie);
    Ok((
        headers,
        Json(MessageResponse::new("Admin logged out successfully.")),
    ))
}

#[instrument(skip_all)]
pub async fn get_profile(AdminPrincipal(admin): AdminPrincipal) -> Json<AdminProfileResponse> {
    Json(AdminProfileResponse {
        id: admin.id,
        name: admin.name,
        email: admin.email,
        is_admin: admin.is_admin,
    })
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(User::list_all(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id, "User")?;
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "User")?;
    if !User::delete(&state.db, id).await? {
        return Err(AppError::not_found("User not found."));
    }
    info!(target_user = %id, admin = %admin.id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted.")))
}

#[instrument(skip(state))]
pub async fn ban_user(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<UserActionResponse>, AppError> {
    let id = parse_id(&id, "User")?;
    let user = User::set_banned(&state.db, id, true)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    info!(target_user = %id, admin = %admin.id, "user banned");
    Ok(Json(UserActionResponse {
        message: "User has been banned.".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn unban_user(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<UserActionResponse>, AppError> {
    let id = parse_id(&id, "User")?;
    let user = User::set_banned(&state.db, id, false)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    info!(target_user = %id, admin = %admin.id, "user unbanned");
    Ok(Json(UserActionResponse {
        message: "User has been unbanned.".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn list_issues(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
) -> Result<Json<Vec<Issue>>, AppError> {
    Ok(Json(Issue::list_all(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn solve_issue(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<IssueActionResponse>, AppError> {
    let id = parse_id(&id, "Issue")?;
    let issue = Issue::set_status(&state.db, id, IssueStatus::Solved)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;
    info!(issue_id = %id, admin = %admin.id, "issue marked solved");
    Ok(Json(IssueActionResponse {
        message: "Issue marked as solved.".into(),
        issue,
    }))
}

#[instrument(skip(state))]
pub async fn unsolve_issue(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<IssueActionResponse>, AppError> {
    let id = parse_id(&id, "Issue")?;
    let issue = Issue::set_status(&state.db, id, IssueStatus::Unsolved)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;
    info!(issue_id = %id, admin = %admin.id, "issue marked unsolved");
    Ok(Json(IssueActionResponse {
        message: "Issue marked as unsolved.".into(),
        issue,
    }))
}

#[instrument(skip(state))]
pub async fn delete_issue(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Issue")?;
    let issue = Issue::delete(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;

    // The row is the source of truth; a dangling object is only noise.
    if let Err(e) = state.storage.delete_object(&issue.image).await {
        warn!(error = %e, key = %issue.image, "stored image cleanup failed");
    }

    info!(issue_id = %id, admin = %admin.id, "issue deleted");
    Ok(Json(MessageResponse::new("Issue has been deleted.")))
}

#[instrument(skip(state, payload))]
pub async fn send_notification(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    Path(_id): Path<String>,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if !is_expo_push_token(&payload.token) {
        return Err(AppError::validation(
            "The given token is not a valid Expo push token.",
        ));
    }
    state
        .push
        .send(&payload.token, &payload.title, &payload.body)
        .await?;
    Ok(Json(MessageResponse::new("Notification sent successfully.")))
}

#[instrument(skip(state, payload))]
pub async fn send_positive_feedback(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    dispatch_feedback(
        &state,
        &admin,
        &id,
        &payload.feedback_message,
        IssueStatus::Solved,
    )
    .await
}

#[instrument(skip(state, payload))]
pub async fn send_negative_feedback(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    dispatch_feedback(
        &state,
        &admin,
        &id,
        &payload.feedback_message,
        IssueStatus::Unsolved,
    )
    .await
}

/// Send first, then mutate: a failed push legitimately prevents the status
/// change, because the user must learn about the transition.
async fn dispatch_feedback(
    state: &AppState,
    admin: &User,
    raw_id: &str,
    feedback_message: &str,
    status: IssueStatus,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(raw_id, "Issue")?;
    let issue = Issue::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;

    let Some(owner) = User::find_by_id(&state.db, issue.user_id).await? else {
        return Err(AppError::not_found(
            "User not found or push token is not available.",
        ));
    };
    let Some(push_token) = owner.push_token.as_deref() else {
        return Err(AppError::not_found(
            "User not found or push token is not available.",
        ));
    };

    let (title, body) = match status {
        IssueStatus::Solved => (
            "Your reported issue has been solved!",
            format!(
                "Thanks for your cooperation, {}! {}",
                owner.name, feedback_message
            ),
        ),
        _ => (
            "Unfortunately, your reported issue could not be solved.",
            format!(
                "Thanks for your cooperation, {}. {}",
                owner.name, feedback_message
            ),
        ),
    };

    state.push.send(push_token, title, &body).await?;

    Issue::set_status_with_feedback(&state.db, id, status, feedback_message)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;

    info!(issue_id = %id, admin = %admin.id, status = ?status, "feedback dispatched");
    Ok(Json(MessageResponse::new(
        "Feedback sent and issue updated.",
    )))
}
