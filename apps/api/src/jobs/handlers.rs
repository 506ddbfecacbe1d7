//! Axum route handlers for the Job API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::agent::{dispatch, DispatchReply};
use crate::applications::handlers::applications_for_owned_job;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::repo::{self, NewJob};
use crate::models::application::ApplicationOut;
use crate::models::job::{JobCreate, JobRow};
use crate::models::user::Role;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// POST /job/post_job
pub async fn handle_post_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<JobCreate>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let scope = user.hiring_manager_scope("Only hiring managers can create jobs")?;
    require_text("title", &req.title)?;
    require_text("description", &req.description)?;
    require_text("location", &req.location)?;

    let job = repo::insert_job(
        &state.db,
        scope.id(),
        &NewJob {
            title: &req.title,
            description: &req.description,
            location: &req.location,
            salary: req.salary.as_deref(),
        },
    )
    .await?;

    tracing::info!("Job {} created by hiring manager {}", job.id, scope);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /job/all
/// Hiring managers see their own postings; applicants see the jobs they applied to.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let jobs = match user.role() {
        Some(Role::Applicant) => repo::list_jobs_for_applicant(&state.db, user.id()).await?,
        _ => repo::list_jobs_for_manager(&state.db, user.id()).await?,
    };
    Ok(Json(jobs))
}

/// GET /job/browse
pub async fn handle_browse_jobs(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(repo::list_all_jobs(&state.db).await?))
}

/// POST /job/my_jobs
/// Free-text command for the hiring-manager agent.
pub async fn handle_agent_command(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CommandRequest>,
) -> Result<Json<DispatchReply>, AppError> {
    let scope = user.hiring_manager_scope("Only hiring managers can view their jobs")?;
    require_text("command", &req.command)?;

    let reply = dispatch(&state.dispatch_context(), &req.command, scope).await?;
    Ok(Json(reply))
}

/// GET /job/:job_id/applicants
pub async fn handle_job_applicants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<i32>,
) -> Result<Json<Vec<ApplicationOut>>, AppError> {
    let scope = user.hiring_manager_scope("Only hiring managers can view job applicants")?;
    Ok(Json(applications_for_owned_job(&state.db, job_id, scope).await?))
}
