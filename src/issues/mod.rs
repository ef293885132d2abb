pub mod dto;
pub mod handlers;
pub mod repo;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_issue))
        .route("/myissues", get(handlers::get_my_issues))
        .route("/:id", get(handlers::get_issue_by_id))
}
