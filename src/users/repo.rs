use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::users::repo_types::{User, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with the same (case-insensitive) email already exists.
    #[error("duplicate email")]
    Duplicate,

    #[error("user store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Unavailable(e.into())
    }
}

/// Persistent collection of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Single-record write. Implementations must report `StoreError::Duplicate`
    /// when the email is already taken, even if a prior lookup missed it.
    async fn insert(&self, user: User) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_user(row: UserRow) -> Result<User, StoreError> {
    User::try_from(row).map_err(|e| StoreError::Unavailable(e.into()))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_user).transpose()
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await?;
        debug!(user_id = %row.id, "user row inserted");
        into_user(row)
    }
}
