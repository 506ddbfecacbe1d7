//! The tool set exposed to the hiring-manager agent.
//!
//! Each tool takes the caller's `HiringManagerScope` as an explicit argument
//! and returns a `ToolResult`: confirmation text on success, explanation text
//! on a validation rejection or persistence fault. Write tools run in their own
//! transaction; an uncommitted transaction is rolled back when dropped, which
//! also returns the connection to the pool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::agent::query::run_scoped_query;
use crate::agent::{ToolExecutor, ToolResult};
use crate::applications::repo as applications_repo;
use crate::auth::HiringManagerScope;
use crate::jobs::repo::{self as jobs_repo, NewJob};
use crate::llm_client::ToolSpec;
use crate::models::application::ApplicationStatus;
use crate::models::job::JobRow;

pub const CREATE_JOB_POSTING: &str = "create_job_posting";
pub const UPDATE_APPLICATION_STATUS: &str = "update_application_status";
pub const DELETE_JOB_POSTING: &str = "delete_job_posting";
pub const QUERY_DATABASE: &str = "query_database";

pub const APPLICATION_NOT_FOUND: &str =
    "Application not found or you don't have permission to update it.";
pub const JOB_NOT_FOUND: &str = "Job not found or you don't have permission to delete it.";

// ────────────────────────────────────────────────────────────────────────────
// Tool calls
// ────────────────────────────────────────────────────────────────────────────

/// Arguments the model may supply. None of them carry a hiring-manager id;
/// an extra `hiring_manager_id` key in the model's input is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateJobArgs {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub salary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateStatusArgs {
    pub application_id: String,
    pub new_status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteJobArgs {
    pub job_id: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryArgs {
    pub sql: String,
}

/// The closed set of operations the agent can invoke.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "input", rename_all = "snake_case")]
pub enum ToolCall {
    CreateJobPosting(CreateJobArgs),
    UpdateApplicationStatus(UpdateStatusArgs),
    DeleteJobPosting(DeleteJobArgs),
    QueryDatabase(QueryArgs),
}

impl ToolCall {
    pub fn decode(name: &str, input: Value) -> Result<Self, String> {
        if !tool_specs().iter().any(|spec| spec.name == name) {
            return Err(format!("Unknown tool: {name}"));
        }
        serde_json::from_value(json!({ "name": name, "input": input }))
            .map_err(|e| format!("Invalid arguments for {name}: {e}"))
    }
}

/// Tool descriptions sent to the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: CREATE_JOB_POSTING,
            description: "Create a new job posting owned by the current hiring manager. \
                The posting time is set by the server.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Job title"},
                    "description": {"type": "string", "description": "Job description"},
                    "location": {"type": "string", "description": "Job location"},
                    "salary": {"type": "string", "description": "Optional salary information"}
                },
                "required": ["title", "description", "location"]
            }),
        },
        ToolSpec {
            name: UPDATE_APPLICATION_STATUS,
            description: "Update the status of an application to one of the current hiring \
                manager's jobs.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "application_id": {"type": "string", "description": "UUID of the application"},
                    "new_status": {
                        "type": "string",
                        "enum": ApplicationStatus::ALL
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                    }
                },
                "required": ["application_id", "new_status"]
            }),
        },
        ToolSpec {
            name: DELETE_JOB_POSTING,
            description: "Delete one of the current hiring manager's job postings. \
                All applications to the job are deleted with it.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "job_id": {"type": "integer", "description": "ID of the job to delete"}
                },
                "required": ["job_id"]
            }),
        },
        ToolSpec {
            name: QUERY_DATABASE,
            description: "Run one read-only SELECT over the users, jobs and applications tables. \
                Only rows belonging to the current hiring manager are visible. \
                Returns at most 100 rows as a JSON array.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {"type": "string", "description": "A single SELECT statement"}
                },
                "required": ["sql"]
            }),
        },
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Tools
// ────────────────────────────────────────────────────────────────────────────

/// Inserts a job bound to `scope`.
pub async fn create_job_posting(
    pool: &PgPool,
    scope: HiringManagerScope,
    title: &str,
    description: &str,
    location: &str,
    salary: Option<&str>,
) -> ToolResult {
    let job = NewJob {
        title,
        description,
        location,
        salary,
    };

    let created: Result<JobRow, sqlx::Error> = async {
        let mut tx = pool.begin().await?;
        let row = jobs_repo::insert_job(&mut *tx, scope.id(), &job).await?;
        tx.commit().await?;
        Ok(row)
    }
    .await;
    let created = created.map_err(|e| format!("Error creating job: {e}"))?;

    let salary = created
        .salary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Not specified");

    Ok(format!(
        "Job created successfully! ID: {}, Title: {}, Location: {}, Salary: {}, Posted: {}",
        created.id,
        created.title,
        created.location,
        salary,
        created.posted_at.format("%Y-%m-%d %H:%M:%S UTC")
    ))
}

/// Sets an application's status, provided its job belongs to `scope`.
pub async fn update_application_status(
    pool: &PgPool,
    application_id: &str,
    scope: HiringManagerScope,
    new_status: &str,
) -> ToolResult {
    let status: ApplicationStatus = new_status.parse().map_err(|_| {
        format!(
            "Invalid status. Must be one of: {}",
            ApplicationStatus::allowed_list()
        )
    })?;

    // A malformed id cannot match any row; answer exactly as for a missing one.
    let application_id = Uuid::parse_str(application_id.trim())
        .map_err(|_| APPLICATION_NOT_FOUND.to_string())?;

    let updated = applications_repo::set_status_if_owned(pool, application_id, scope.id(), status)
        .await
        .map_err(|e| format!("Error updating application status: {e}"))?;

    let (full_name, stored_status) = updated.ok_or_else(|| APPLICATION_NOT_FOUND.to_string())?;
    Ok(format!(
        "Application status updated! Applicant: {full_name}, New Status: {stored_status}"
    ))
}

/// Deletes a job owned by `scope`, cascading to its applications.
pub async fn delete_job_posting(
    pool: &PgPool,
    job_id: i32,
    scope: HiringManagerScope,
) -> ToolResult {
    let deleted: Result<Option<String>, sqlx::Error> = async {
        let mut tx = pool.begin().await?;
        let Some(job) = jobs_repo::find_owned_job(&mut *tx, job_id, scope.id()).await? else {
            return Ok(None);
        };
        jobs_repo::delete_job(&mut *tx, job.id).await?;
        tx.commit().await?;
        Ok(Some(job.title))
    }
    .await;
    let deleted = deleted.map_err(|e| format!("Error deleting job: {e}"))?;

    let title = deleted.ok_or_else(|| JOB_NOT_FOUND.to_string())?;
    Ok(format!(
        "Job '{title}' (ID: {job_id}) has been deleted successfully."
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Executor bound to one scope
// ────────────────────────────────────────────────────────────────────────────

/// The tool set for one command. The scope is fixed at construction.
pub struct ScopedToolSet {
    pool: PgPool,
    scope: HiringManagerScope,
}

impl ScopedToolSet {
    pub fn new(pool: PgPool, scope: HiringManagerScope) -> Self {
        Self { pool, scope }
    }

    #[cfg(test)]
    pub fn scope(&self) -> HiringManagerScope {
        self.scope
    }
}

#[async_trait]
impl ToolExecutor for ScopedToolSet {
    fn specs(&self) -> Vec<ToolSpec> {
        tool_specs()
    }

    async fn execute(&self, name: &str, input: Value) -> ToolResult {
        let call = ToolCall::decode(name, input)?;
        info!(tool = name, hiring_manager_id = %self.scope, "Executing agent tool");

        match call {
            ToolCall::CreateJobPosting(args) => {
                create_job_posting(
                    &self.pool,
                    self.scope,
                    &args.title,
                    &args.description,
                    &args.location,
                    args.salary.as_deref(),
                )
                .await
            }
            ToolCall::UpdateApplicationStatus(args) => {
                update_application_status(
                    &self.pool,
                    &args.application_id,
                    self.scope,
                    &args.new_status,
                )
                .await
            }
            ToolCall::DeleteJobPosting(args) => {
                delete_job_posting(&self.pool, args.job_id, self.scope).await
            }
            ToolCall::QueryDatabase(args) => {
                run_scoped_query(&self.pool, self.scope, &args.sql).await
            }
        }
    }
}
