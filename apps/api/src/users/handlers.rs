//! Axum route handlers for signup, login and the current user.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::create_access_token;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{is_plausible_email, Role, UserOut};
use crate::state::AppState;
use crate::users::repo;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl SignupRequest {
    fn validate(&self) -> Result<Role, AppError> {
        if !is_plausible_email(self.email.trim()) {
            return Err(AppError::Validation("email is not a valid address".to_string()));
        }
        if !(8..=72).contains(&self.password.chars().count()) {
            return Err(AppError::Validation(
                "password must be between 8 and 72 characters".to_string(),
            ));
        }
        self.role.parse().map_err(|_| {
            AppError::Validation("role must be hiring_manager or applicant".to_string())
        })
    }
}

/// POST /auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserOut>), AppError> {
    let role = req.validate()?;
    let email = req.email.trim();

    if repo::find_user_by_email(&state.db, email).await?.is_some() {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;

    let user = repo::insert_user(&state.db, email, &password_hash, role).await?;
    info!("User {} signed up as {}", user.id, role);

    Ok((StatusCode::CREATED, Json(UserOut::from(&user))))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = repo::find_user_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let stored = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&req.password, &stored))
        .await
        .map_err(anyhow::Error::from)?;
    if !verified {
        return Err(invalid());
    }

    let role: Role = user
        .role
        .parse()
        .map_err(|_| anyhow::anyhow!("user {} has unknown role '{}'", user.id, user.role))?;
    let access_token = create_access_token(
        &state.config.jwt_secret,
        user.id,
        role,
        state.config.jwt_expires_min,
    )
    .map_err(anyhow::Error::from)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// GET /auth/me
pub async fn handle_me(user: AuthUser) -> Json<UserOut> {
    Json(UserOut::from(&user.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_valid_signup_yields_role() {
        assert_eq!(
            signup("hm@example.com", "longenough", "hiring_manager").validate().unwrap(),
            Role::HiringManager
        );
    }

    #[test]
    fn test_unknown_role_rejected_with_message() {
        let err = signup("a@example.com", "longenough", "admin").validate().unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(msg) if msg == "role must be hiring_manager or applicant"
        ));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(signup("a@example.com", "short", "applicant").validate().is_err());
        assert!(signup("a@example.com", &"x".repeat(73), "applicant").validate().is_err());
        assert!(signup("a@example.com", &"x".repeat(72), "applicant").validate().is_ok());
    }

    #[test]
    fn test_password_length_counts_characters_not_bytes() {
        // 8 characters, 17 bytes.
        assert!(signup("a@example.com", "ééééééé€", "applicant").validate().is_ok());
        // 72 characters, 144 bytes.
        assert!(signup("a@example.com", &"é".repeat(72), "applicant").validate().is_ok());
        assert!(signup("a@example.com", &"é".repeat(73), "applicant").validate().is_err());
    }
}
