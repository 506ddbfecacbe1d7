use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::user::{Role, UserRow};

pub async fn find_user<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Emails are stored lowercased, so lookups lowercase too.
pub async fn find_user_by_email<'e>(
    db: impl PgExecutor<'e>,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(db)
        .await
}

pub async fn insert_user<'e>(
    db: impl PgExecutor<'e>,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.to_lowercase())
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(db)
    .await
}
