use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of an application. Any state may move to any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Reviewed,
    Shortlisted,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Accepted => "accepted",
        }
    }

    /// Comma-separated list of every valid status, in declaration order.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ();

    /// Exact, case-sensitive match against the stored values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: i32,
    pub applicant_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub cv_s3_key: Option<String>,
    pub cv_filename: Option<String>,
    pub cv_mime: Option<String>,
    pub cv_size: Option<i32>,
}

/// Client-facing shape of an application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationOut {
    pub id: Uuid,
    pub job_id: i32,
    pub applicant_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
    pub cover_letter: Option<String>,
    pub cv_filename: Option<String>,
    pub has_cv: bool,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<ApplicationRow> for ApplicationOut {
    fn from(row: ApplicationRow) -> Self {
        ApplicationOut {
            has_cv: row.cv_s3_key.is_some(),
            id: row.id,
            job_id: row.job_id,
            applicant_id: row.applicant_id,
            full_name: row.full_name,
            phone: row.phone,
            email: row.email,
            cover_letter: row.cover_letter,
            cv_filename: row.cv_filename,
            status: row.status,
            submitted_at: row.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_every_stored_value() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_status_is_case_sensitive() {
        assert!("Accepted".parse::<ApplicationStatus>().is_err());
        assert!(" accepted".parse::<ApplicationStatus>().is_err());
        assert!("hired".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_allowed_list_matches_documented_order() {
        assert_eq!(
            ApplicationStatus::allowed_list(),
            "submitted, reviewed, shortlisted, rejected, accepted"
        );
    }

    #[test]
    fn test_application_out_reports_cv_presence_without_key() {
        let row = ApplicationRow {
            id: Uuid::new_v4(),
            job_id: 7,
            applicant_id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            cover_letter: None,
            status: "submitted".to_string(),
            submitted_at: Utc::now(),
            cv_s3_key: Some("applications/x/cv/ada.pdf".to_string()),
            cv_filename: Some("ada.pdf".to_string()),
            cv_mime: Some("application/pdf".to_string()),
            cv_size: Some(1024),
        };
        let out = ApplicationOut::from(row);
        assert!(out.has_cv);
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("cv_s3_key").is_none());
    }
}
