use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, SignupRequest, SignupResponse},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        validation::{is_valid_email, normalize_email, validate_signup},
    },
    error::{AppError, AppResult},
    users::{User, UserStore},
};

/// Validates, checks uniqueness, hashes, persists, and issues a token.
///
/// Validation and conflict failures return before any write. The pre-insert
/// lookup only saves a hash on the common path; the store's unique key
/// decides concurrent signups, and its duplicate report becomes `Conflict`.
pub async fn signup(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: SignupRequest,
) -> AppResult<SignupResponse> {
    let input = validate_signup(req).map_err(|e| {
        warn!(error = %e, "signup rejected");
        e
    })?;
    debug!(email = %input.email, "signup validated");

    if store.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::Conflict);
    }

    let hash = hash_password_blocking(input.password).await?;
    let user = User::new(input.name, input.email, hash, input.role);

    let user = store.insert(user).await.map_err(|e| {
        let e = AppError::from(e);
        if matches!(e, AppError::Conflict) {
            warn!("email registered concurrently");
        }
        e
    })?;

    let token = keys.sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok(SignupResponse {
        name: user.name,
        email: user.email,
        role: user.role,
        token,
    })
}

pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("email", "is not a valid address"));
    }

    let Some(user) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.sign(user.id, user.role)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::JwtConfig,
        users::{InMemoryUserStore, Role, StoreError},
    };

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    fn req(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    /// Delegates to an in-memory store but can hide existing records from
    /// lookups (a lost check-then-insert race) or fail writes outright.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryUserStore,
        blind_lookups: bool,
        fail_inserts: bool,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for ScriptedStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            if self.blind_lookups {
                return Ok(None);
            }
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn insert(&self, user: User) -> Result<User, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_inserts {
                return Err(StoreError::Unavailable(anyhow::anyhow!("connection reset")));
            }
            self.inner.insert(user).await
        }
    }

    #[tokio::test]
    async fn signup_defaults_role_and_stores_hash() {
        let store = InMemoryUserStore::new();
        let keys = keys();
        let res = signup(&store, &keys, req("Test User", "a@example.com", "password123"))
            .await
            .unwrap();

        assert_eq!(res.name, "Test User");
        assert_eq!(res.email, "a@example.com");
        assert_eq!(res.role, Role::Member);

        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password123");
        assert!(stored.password_hash.starts_with("$argon2id$"));

        let claims = keys.verify(&res.token).unwrap();
        assert_eq!(claims.sub, stored.id);
        assert_eq!(claims.role, Role::Member);
    }

    #[tokio::test]
    async fn signup_response_never_carries_secrets() {
        let store = InMemoryUserStore::new();
        let res = signup(&store, &keys(), req("Test User", "a@example.com", "password123"))
            .await
            .unwrap();
        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();

        let json = serde_json::to_string(&res).unwrap();
        assert!(!json.contains("password123"));
        assert!(!json.contains(&stored.password_hash));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = InMemoryUserStore::new();
        let keys = keys();
        signup(&store, &keys, req("Test User", "a@example.com", "password123"))
            .await
            .unwrap();

        let err = signup(&store, &keys, req("Other", "A@EXAMPLE.COM", "password456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict));
        assert_eq!(store.count_by_email("a@example.com").await, 1);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing_and_repeats() {
        let store = ScriptedStore::default();
        let keys = keys();

        let first = signup(&store, &keys, req("", "bad", "123")).await.unwrap_err();
        let second = signup(&store, &keys, req("", "bad", "123")).await.unwrap_err();

        assert!(matches!(first, AppError::Validation { field: "name", .. }));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.len().await, 0);
    }

    #[tokio::test]
    async fn lost_race_on_insert_is_a_conflict() {
        let store = ScriptedStore {
            blind_lookups: true,
            ..Default::default()
        };
        let keys = keys();
        signup(&store, &keys, req("A", "race@example.com", "password123"))
            .await
            .unwrap();

        let err = signup(&store, &keys, req("B", "race@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict));
        assert_eq!(store.inner.count_by_email("race@example.com").await, 1);
    }

    #[tokio::test]
    async fn concurrent_signups_for_one_email_yield_one_user() {
        let store = Arc::new(InMemoryUserStore::new());
        let keys = keys();

        let (a, b) = tokio::join!(
            signup(&*store, &keys, req("A", "same@example.com", "password123")),
            signup(&*store, &keys, req("B", "Same@Example.com", "password123")),
        );

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, AppError::Conflict));
        assert_eq!(store.count_by_email("same@example.com").await, 1);
    }

    #[tokio::test]
    async fn store_write_failure_is_store_unavailable() {
        let store = ScriptedStore {
            fail_inserts: true,
            ..Default::default()
        };
        let err = signup(&store, &keys(), req("A", "a@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_accepts_correct_password_only() {
        let store = InMemoryUserStore::new();
        let keys = keys();
        signup(&store, &keys, req("Test User", "a@example.com", "password123"))
            .await
            .unwrap();

        let ok = login(
            &store,
            &keys,
            LoginRequest {
                email: " A@example.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.user.email, "a@example.com");
        assert!(keys.verify(&ok.token).is_ok());

        let wrong = login(
            &store,
            &keys,
            LoginRequest {
                email: "a@example.com".into(),
                password: "nope-nope".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));

        let unknown = login(
            &store,
            &keys,
            LoginRequest {
                email: "b@example.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
    }
}
