//! SQL for the `applications` table.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};

pub struct NewApplication<'a> {
    pub id: Uuid,
    pub job_id: i32,
    pub applicant_id: Uuid,
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub cover_letter: Option<&'a str>,
}

pub struct CvObject<'a> {
    pub s3_key: &'a str,
    pub filename: &'a str,
    pub mime: Option<&'a str>,
    pub size: i32,
}

pub async fn insert_application<'e>(
    db: impl PgExecutor<'e>,
    app: &NewApplication<'_>,
) -> Result<ApplicationRow, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (id, job_id, applicant_id, full_name, email, phone, cover_letter, status, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'submitted', NOW())
        RETURNING *
        "#,
    )
    .bind(app.id)
    .bind(app.job_id)
    .bind(app.applicant_id)
    .bind(app.full_name)
    .bind(app.email)
    .bind(app.phone)
    .bind(app.cover_letter)
    .fetch_one(db)
    .await
}

pub async fn attach_cv<'e>(
    db: impl PgExecutor<'e>,
    application_id: Uuid,
    cv: &CvObject<'_>,
) -> Result<ApplicationRow, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications
        SET cv_s3_key = $2, cv_filename = $3, cv_mime = $4, cv_size = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(application_id)
    .bind(cv.s3_key)
    .bind(cv.filename)
    .bind(cv.mime)
    .bind(cv.size)
    .fetch_one(db)
    .await
}

pub async fn find_application<'e>(
    db: impl PgExecutor<'e>,
    application_id: Uuid,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(db)
        .await
}

/// Updates the status only when the application's job belongs to the manager,
/// in one statement. `None` covers both "missing" and "not yours".
/// Returns `(full_name, status)` as stored after the update.
pub async fn set_status_if_owned<'e>(
    db: impl PgExecutor<'e>,
    application_id: Uuid,
    hiring_manager_id: Uuid,
    status: ApplicationStatus,
) -> Result<Option<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        r#"
        UPDATE applications a
        SET status = $1
        FROM jobs j
        WHERE a.id = $2 AND a.job_id = j.id AND j.hiring_manager_id = $3
        RETURNING a.full_name, a.status
        "#,
    )
    .bind(status.as_str())
    .bind(application_id)
    .bind(hiring_manager_id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_applicant<'e>(
    db: impl PgExecutor<'e>,
    applicant_id: Uuid,
) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE applicant_id = $1 ORDER BY submitted_at DESC",
    )
    .bind(applicant_id)
    .fetch_all(db)
    .await
}

pub async fn list_for_job<'e>(
    db: impl PgExecutor<'e>,
    job_id: i32,
) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE job_id = $1 ORDER BY submitted_at DESC",
    )
    .bind(job_id)
    .fetch_all(db)
    .await
}
