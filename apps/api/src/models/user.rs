use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HiringManager,
    Applicant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HiringManager => "hiring_manager",
            Role::Applicant => "applicant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hiring_manager" => Ok(Role::HiringManager),
            "applicant" => Ok(Role::Applicant),
            _ => Err(()),
        }
    }
}

/// Full user row. Never serialized to clients because it carries the hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserOut {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRow> for UserOut {
    fn from(row: &UserRow) -> Self {
        UserOut {
            id: row.id,
            email: row.email.clone(),
            role: row.role.clone(),
            created_at: row.created_at,
        }
    }
}

/// Loose shape check: one `@`, a non-empty local part, a dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_both_known_roles() {
        assert_eq!("hiring_manager".parse::<Role>(), Ok(Role::HiringManager));
        assert_eq!("applicant".parse::<Role>(), Ok(Role::Applicant));
    }

    #[test]
    fn test_role_rejects_unknown_and_differently_cased() {
        assert!("admin".parse::<Role>().is_err());
        assert!("Applicant".parse::<Role>().is_err());
    }

    #[test]
    fn test_public_view_carries_signup_time_but_never_the_hash() {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "applicant".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(UserOut::from(&row)).unwrap();
        assert_eq!(value["email"], "ada@example.com");
        assert!(value.get("created_at").is_some());
        assert!(value.get("password_hash").is_none());
        assert!(!value.to_string().contains("argon2"));
    }

    #[test]
    fn test_plausible_email() {
        assert!(is_plausible_email("ada@example.com"));
        assert!(!is_plausible_email("ada.example.com"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("ada@localhost"));
        assert!(!is_plausible_email("ada@@example.com"));
        assert!(!is_plausible_email("ada lovelace@example.com"));
    }
}
