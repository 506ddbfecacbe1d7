//! SQL for the `jobs` table. Every function takes any Postgres executor so the
//! same statement can run on the pool or inside a caller's transaction.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::job::JobRow;

pub struct NewJob<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub salary: Option<&'a str>,
}

/// Inserts a job owned by `hiring_manager_id`. `posted_at` comes from the database clock.
pub async fn insert_job<'e>(
    db: impl PgExecutor<'e>,
    hiring_manager_id: Uuid,
    job: &NewJob<'_>,
) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs (title, description, location, salary, hiring_manager_id, posted_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id, title, description, location, salary, posted_at, hiring_manager_id
        "#,
    )
    .bind(job.title)
    .bind(job.description)
    .bind(job.location)
    .bind(job.salary)
    .bind(hiring_manager_id)
    .fetch_one(db)
    .await
}

pub async fn find_job<'e>(
    db: impl PgExecutor<'e>,
    job_id: i32,
) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(db)
        .await
}

/// Looks a job up by id *and* owner. `None` covers both "missing" and "not yours".
pub async fn find_owned_job<'e>(
    db: impl PgExecutor<'e>,
    job_id: i32,
    hiring_manager_id: Uuid,
) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND hiring_manager_id = $2")
        .bind(job_id)
        .bind(hiring_manager_id)
        .fetch_optional(db)
        .await
}

/// Deletes a job. Applications go with it through `ON DELETE CASCADE`.
pub async fn delete_job<'e>(db: impl PgExecutor<'e>, job_id: i32) -> Result<u64, sqlx::Error> {
    Ok(sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(db)
        .await?
        .rows_affected())
}

pub async fn list_jobs_for_manager<'e>(
    db: impl PgExecutor<'e>,
    hiring_manager_id: Uuid,
) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE hiring_manager_id = $1 ORDER BY posted_at DESC, id DESC",
    )
    .bind(hiring_manager_id)
    .fetch_all(db)
    .await
}

pub async fn list_all_jobs<'e>(db: impl PgExecutor<'e>) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY posted_at DESC, id DESC")
        .fetch_all(db)
        .await
}

/// Jobs the applicant has applied to, most recent application first.
pub async fn list_jobs_for_applicant<'e>(
    db: impl PgExecutor<'e>,
    applicant_id: Uuid,
) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT j.*
        FROM jobs j
        JOIN applications a ON a.job_id = j.id
        WHERE a.applicant_id = $1
        ORDER BY a.submitted_at DESC
        "#,
    )
    .bind(applicant_id)
    .fetch_all(db)
    .await
}
