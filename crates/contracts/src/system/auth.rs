use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::Role;

/// Login by username or email; the caller does not need to know which
/// one matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Claims carried by every access token. The signature covers all fields,
/// so none of them can change without invalidating the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the username.
    pub sub: String,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Issued-at (Unix timestamp).
    pub iat: usize,
    /// Expiration (Unix timestamp), issued-at plus the configured TTL.
    pub exp: usize,
}
