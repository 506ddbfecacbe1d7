pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::state::AppState;
use crate::users::handlers as users;

/// Multipart bodies carry the CV plus the text fields.
const APPLY_BODY_LIMIT: usize = 11 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Auth
        .route("/auth/signup", post(users::handle_signup))
        .route("/auth/login", post(users::handle_login))
        .route("/auth/me", get(users::handle_me))
        // Jobs
        .route("/job/post_job", post(jobs::handle_post_job))
        .route("/job/all", get(jobs::handle_list_jobs))
        .route("/job/browse", get(jobs::handle_browse_jobs))
        .route("/job/my_jobs", post(jobs::handle_agent_command))
        .route("/job/:job_id/applicants", get(jobs::handle_job_applicants))
        // Applications
        .route(
            "/applications/apply/:job_id",
            post(applications::handle_apply).layer(DefaultBodyLimit::max(APPLY_BODY_LIMIT)),
        )
        .route("/applications/my", get(applications::handle_my_applications))
        .route(
            "/applications/job/:job_id",
            get(applications::handle_applications_for_job),
        )
        .route("/applications/:id/cv", get(applications::handle_cv_url))
        .with_state(state)
}
