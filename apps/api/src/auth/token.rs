//! Bearer token issuing and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn create_access_token(
    secret: &str,
    user_id: Uuid,
    role: Role,
    expires_min: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::minutes(expires_min)).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies signature and expiry, returning the subject's user id.
/// Any failure collapses to `None`; callers answer 401 either way.
pub fn verify_access_token(secret: &str, token: &str) -> Option<Uuid> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .ok()?;
    Uuid::parse_str(&data.claims.sub).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-entropy";

    #[test]
    fn test_issued_token_verifies_to_same_user() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(SECRET, user_id, Role::HiringManager, 60).unwrap();
        assert_eq!(verify_access_token(SECRET, &token), Some(user_id));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token =
            create_access_token("another-secret", Uuid::new_v4(), Role::Applicant, 60).unwrap();
        assert_eq!(verify_access_token(SECRET, &token), None);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Well past the default 60s leeway.
        let token = create_access_token(SECRET, Uuid::new_v4(), Role::Applicant, -10).unwrap();
        assert_eq!(verify_access_token(SECRET, &token), None);
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert_eq!(verify_access_token(SECRET, "not.a.jwt"), None);
    }
}
