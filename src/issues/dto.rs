use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::issues::repo::Issue;

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    pub code: String,
    pub address: String,
    pub image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyIssuesResponse {
    pub user_name: String,
    pub user_id: Uuid,
    pub user_issues: Vec<Issue>,
}
