pub mod dto;
pub mod handlers;
pub mod repo;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register))
        .route("/auth", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/verify-email", post(handlers::verify_email))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .route("/push-token", put(handlers::update_push_token))
}
