use lazy_static::lazy_static;
use regex::Regex;

use crate::{auth::dto::SignupRequest, error::AppError, users::Role};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Signup input that passed validation, already normalized.
#[derive(Debug)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Checks fields in order name, email, password, role and reports the first
/// violation.
pub fn validate_signup(req: SignupRequest) -> Result<ValidSignup, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }

    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::validation("email", "must not be empty"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("email", "is not a valid address"));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            "must be at least 6 characters",
        ));
    }

    let role = match req.role.as_deref() {
        None => Role::default(),
        Some(r) => r
            .parse()
            .map_err(|_| AppError::validation("role", "is not a recognized role"))?,
    };

    Ok(ValidSignup {
        name: name.to_string(),
        email,
        password: req.password,
        role,
    })
}
