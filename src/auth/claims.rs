use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::Role;

/// JWT payload issued on signup and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
    pub role: Role,
}
