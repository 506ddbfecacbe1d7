//! Axum route handlers for the Application API.

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::repo::{self, CvObject, NewApplication};
use crate::applications::storage;
use crate::auth::{AuthUser, HiringManagerScope};
use crate::errors::AppError;
use crate::jobs::repo as jobs_repo;
use crate::models::application::ApplicationOut;
use crate::models::user::{is_plausible_email, Role};
use crate::state::AppState;

const MAX_CV_BYTES: usize = 10 * 1024 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Form parsing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ApplicationForm {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub cv: Option<CvUpload>,
}

#[derive(Debug)]
pub struct CvUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ApplicationForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ApplicationForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "cv" {
                let filename = field.file_name().unwrap_or("cv").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read CV upload: {e}")))?;
                if !bytes.is_empty() {
                    form.cv = Some(CvUpload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
            match name.as_str() {
                "full_name" => form.full_name = value.trim().to_string(),
                "email" => form.email = value.trim().to_string(),
                "phone" => form.phone = non_blank(value),
                "cover_letter" => form.cover_letter = non_blank(value),
                _ => {}
            }
        }

        form.validate()?;
        Ok(form)
    }

    fn validate(&self) -> Result<(), AppError> {
        let name_len = self.full_name.chars().count();
        if !(2..=120).contains(&name_len) {
            return Err(AppError::Validation(
                "full_name must be between 2 and 120 characters".to_string(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(AppError::Validation("email is not a valid address".to_string()));
        }
        if self.phone.as_ref().is_some_and(|p| p.chars().count() > 40) {
            return Err(AppError::Validation("phone must be at most 40 characters".to_string()));
        }
        if self
            .cover_letter
            .as_ref()
            .is_some_and(|c| c.chars().count() > 5000)
        {
            return Err(AppError::Validation(
                "cover_letter must be at most 5000 characters".to_string(),
            ));
        }
        if self.cv.as_ref().is_some_and(|cv| cv.bytes.len() > MAX_CV_BYTES) {
            return Err(AppError::Validation("CV must be at most 10 MB".to_string()));
        }
        Ok(())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Awaits `work`; if it fails, runs `remove` before returning the original error.
async fn remove_on_error<T, W, R>(work: W, remove: R) -> Result<T, AppError>
where
    W: Future<Output = Result<T, AppError>>,
    R: Future<Output = Result<(), AppError>>,
{
    match work.await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(cleanup) = remove.await {
                warn!("Could not remove uploaded CV after a failed submission: {cleanup}");
            }
            Err(err)
        }
    }
}

/// Applications to a job, provided the job belongs to `scope`.
pub async fn applications_for_owned_job(
    db: &PgPool,
    job_id: i32,
    scope: HiringManagerScope,
) -> Result<Vec<ApplicationOut>, AppError> {
    let job = jobs_repo::find_job(db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    if job.hiring_manager_id != scope.id() {
        return Err(AppError::Forbidden("Not allowed".to_string()));
    }

    let rows = repo::list_for_job(db, job_id).await?;
    Ok(rows.into_iter().map(ApplicationOut::from).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /applications/apply/:job_id
pub async fn handle_apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<i32>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationOut>), AppError> {
    user.require_role(Role::Applicant, "Only applicants can apply")?;
    let form = ApplicationForm::from_multipart(multipart).await?;

    if jobs_repo::find_job(&state.db, job_id).await?.is_none() {
        return Err(AppError::NotFound("Job not found".to_string()));
    }

    let application_id = Uuid::new_v4();
    let mut tx = state.db.begin().await?;

    let row = repo::insert_application(
        &mut *tx,
        &NewApplication {
            id: application_id,
            job_id,
            applicant_id: user.id(),
            full_name: &form.full_name,
            email: &form.email,
            phone: form.phone.as_deref(),
            cover_letter: form.cover_letter.as_deref(),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You have already applied to this job".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    // Upload inside the transaction so a failed upload leaves no application behind.
    let row = match form.cv {
        Some(cv) => {
            let key = storage::build_cv_key(&state.config.s3_prefix, application_id, &cv.filename);
            let size = i32::try_from(cv.bytes.len()).unwrap_or(i32::MAX);
            storage::upload_cv(
                &state.s3,
                &state.config.s3_bucket,
                &key,
                cv.bytes,
                cv.content_type.as_deref(),
            )
            .await?;

            let finish = async {
                let row = repo::attach_cv(
                    &mut *tx,
                    application_id,
                    &CvObject {
                        s3_key: &key,
                        filename: &cv.filename,
                        mime: cv.content_type.as_deref(),
                        size,
                    },
                )
                .await?;
                tx.commit().await?;
                Ok::<_, AppError>(row)
            };
            let remove = storage::delete_cv(&state.s3, &state.config.s3_bucket, &key);
            remove_on_error(finish, remove).await?
        }
        None => {
            tx.commit().await?;
            row
        }
    };

    info!("Application {} submitted for job {}", application_id, job_id);

    Ok((StatusCode::CREATED, Json(ApplicationOut::from(row))))
}

/// GET /applications/my
pub async fn handle_my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ApplicationOut>>, AppError> {
    user.require_role(
        Role::Applicant,
        "Only applicants can view their applications",
    )?;
    let rows = repo::list_for_applicant(&state.db, user.id()).await?;
    Ok(Json(rows.into_iter().map(ApplicationOut::from).collect()))
}

/// GET /applications/job/:job_id
pub async fn handle_applications_for_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<i32>,
) -> Result<Json<Vec<ApplicationOut>>, AppError> {
    let scope = user.hiring_manager_scope("Only hiring managers can view job applications")?;
    Ok(Json(applications_for_owned_job(&state.db, job_id, scope).await?))
}

#[derive(Debug, Serialize)]
pub struct CvUrlResponse {
    pub url: String,
    pub expires_in_seconds: u64,
}

/// GET /applications/:id/cv
/// Readable by the applicant who submitted it and by the job's hiring manager.
pub async fn handle_cv_url(
    State(state): State<AppState>,
    user: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<CvUrlResponse>, AppError> {
    let not_found = || AppError::NotFound("Application not found".to_string());

    let application = repo::find_application(&state.db, application_id)
        .await?
        .ok_or_else(not_found)?;

    let allowed = application.applicant_id == user.id()
        || jobs_repo::find_owned_job(&state.db, application.job_id, user.id())
            .await?
            .is_some();
    if !allowed {
        return Err(not_found());
    }

    let key = application
        .cv_s3_key
        .as_deref()
        .ok_or_else(|| AppError::NotFound("No CV uploaded for this application".to_string()))?;

    let expires = state.config.s3_presign_expires_seconds;
    let url = storage::presign_cv_url(
        &state.s3,
        &state.config.s3_bucket,
        key,
        application.cv_filename.as_deref(),
        Duration::from_secs(expires),
    )
    .await?;

    Ok(Json(CvUrlResponse {
        url,
        expires_in_seconds: expires,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn valid_form() -> ApplicationForm {
        ApplicationForm {
            full_name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: None,
            cover_letter: Some("I debug things.".to_string()),
            cv: None,
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_short_name_rejected() {
        let form = ApplicationForm {
            full_name: "G".to_string(),
            ..valid_form()
        };
        assert!(matches!(form.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_email_rejected() {
        let form = ApplicationForm {
            email: "grace-at-example".to_string(),
            ..valid_form()
        };
        assert!(matches!(form.validate(), Err(AppError::Validation(msg)) if msg.contains("email")));
    }

    #[test]
    fn test_long_cover_letter_rejected() {
        let form = ApplicationForm {
            cover_letter: Some("x".repeat(5001)),
            ..valid_form()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_oversized_cv_rejected() {
        let form = ApplicationForm {
            cv: Some(CvUpload {
                filename: "cv.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                bytes: Bytes::from(vec![0u8; MAX_CV_BYTES + 1]),
            }),
            ..valid_form()
        };
        assert!(form.validate().is_err());
    }

    #[tokio::test]
    async fn test_failed_submission_removes_the_uploaded_cv() {
        let removed = AtomicBool::new(false);
        let result: Result<(), AppError> = remove_on_error(
            async { Err(AppError::Conflict("commit failed".to_string())) },
            async {
                removed.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Conflict(msg)) if msg == "commit failed"));
        assert!(removed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_successful_submission_keeps_the_cv() {
        let removed = AtomicBool::new(false);
        let result = remove_on_error(async { Ok(7) }, async {
            removed.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert!(!removed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_the_original_error() {
        let result: Result<(), AppError> = remove_on_error(
            async { Err(AppError::Validation("attach failed".to_string())) },
            async { Err(AppError::S3("bucket gone".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "attach failed"));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        assert_eq!(non_blank("   ".to_string()), None);
        assert_eq!(non_blank(" 555-0100 ".to_string()), Some("555-0100".to_string()));
    }
}
