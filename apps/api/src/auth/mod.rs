//! Authorization context.
//!
//! `AuthUser` resolves the bearer token to a user row. `HiringManagerScope` is
//! the only value the agent layer accepts as its scoping key, and outside of
//! tests it can only be obtained from an authenticated hiring manager.

pub mod password;
pub mod token;

use std::fmt;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;
use crate::users;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRow);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> Option<Role> {
        self.0.role.parse().ok()
    }

    /// Rejects with 403 and `message` unless the caller holds `role`.
    pub fn require_role(&self, role: Role, message: &str) -> Result<(), AppError> {
        if self.role() == Some(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(message.to_string()))
        }
    }

    /// Narrows the caller to a hiring manager and yields their scope.
    pub fn hiring_manager_scope(&self, message: &str) -> Result<HiringManagerScope, AppError> {
        self.require_role(Role::HiringManager, message)?;
        Ok(HiringManagerScope(self.id()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;

        let user_id = token::verify_access_token(&state.config.jwt_secret, token)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        users::repo::find_user(&state.db, user_id)
            .await?
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
    }
}

/// The hiring-manager id that every agent tool call is bound to.
///
/// Fixed when a command is dispatched. Nothing the model produces can replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HiringManagerScope(Uuid);

impl HiringManagerScope {
    #[cfg(test)]
    pub(crate) fn trusted(id: Uuid) -> Self {
        Self(id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for HiringManagerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
