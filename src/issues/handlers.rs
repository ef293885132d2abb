use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::{
    auth::principal::Principal,
    error::{parse_id, AppError},
    issues::{
        dto::{CreateIssueRequest, MyIssuesResponse},
        repo::Issue,
    },
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn create_issue(
    State(state): State<AppState>,
    Principal(user): Principal,
    Json(payload): Json<CreateIssueRequest>,
) -> Result<(StatusCode, Json<Issue>), AppError> {
    let issue = Issue::create(
        &state.db,
        user.id,
        &payload.title,
        &payload.description,
        &payload.code,
        &payload.address,
        &payload.image,
    )
    .await?;

    info!(issue_id = %issue.id, user_id = %user.id, "issue created");
    Ok((StatusCode::CREATED, Json(issue)))
}

#[instrument(skip(state))]
pub async fn get_issue_by_id(
    State(state): State<AppState>,
    Principal(_user): Principal,
    Path(id): Path<String>,
) -> Result<Json<Issue>, AppError> {
    let id = parse_id(&id, "Issue")?;
    let issue = Issue::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Issue not found."))?;
    Ok(Json(issue))
}

#[instrument(skip(state))]
pub async fn get_my_issues(
    State(state): State<AppState>,
    Principal(user): Principal,
) -> Result<Json<MyIssuesResponse>, AppError> {
    let issues = Issue::list_by_user(&state.db, user.id).await?;
    Ok(Json(MyIssuesResponse {
        user_name: user.name,
        user_id: user.id,
        user_issues: issues,
    }))
}
