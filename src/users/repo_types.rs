use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access level attached to an account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// User record as the rest of the service sees it. Responses go through
/// `PublicUser`, never this type.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Builds a fresh record; `email` is expected to be normalized already.
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = UnknownRole;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Member".parse::<Role>().unwrap(), Role::Member);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(
            "owner".parse::<Role>().unwrap_err(),
            UnknownRole("owner".into())
        );
    }

    #[test]
    fn default_role_is_member() {
        assert_eq!(Role::default(), Role::Member);
    }

    #[test]
    fn row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "x".into(),
            email: "x@example.com".into(),
            password_hash: "h".into(),
            role: "superuser".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(User::try_from(row).is_err());
    }
}
