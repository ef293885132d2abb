pub mod dto;
pub mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;

/// Every route below except `auth` and `logout` carries the admin gate
/// through the `AdminPrincipal` extractor, send-notification included.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/profile", get(handlers::get_profile))
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_user_by_id).delete(handlers::delete_user),
        )
        .route("/users/:id/ban", put(handlers::ban_user))
        .route("/users/:id/unban", put(handlers::unban_user))
        .route("/issues", get(handlers::list_issues))
        .route("/issues/:id", delete(handlers::delete_issue))
        .route("/issues/:id/solve", post(handlers::solve_issue))
        .route("/issues/:id/unsolve", post(handlers::unsolve_issue))
        .route("/issues/:id/send-notification", post(handlers::send_notification))
        .route(
            "/issues/:id/send-positive-feedback",
            post(handlers::send_positive_feedback),
        )
        .route(
            "/issues/:id/send-negative-feedback",
            post(handlers::send_negative_feedback),
        )
}
