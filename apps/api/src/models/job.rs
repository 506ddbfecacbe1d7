use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub hiring_manager_id: Uuid,
}

/// Request body for posting a job through the REST surface.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCreate {
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
}
