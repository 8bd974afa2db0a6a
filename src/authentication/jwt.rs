use chrono::{Duration, Local};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{error::ServiceError, schema::UserRole};

use super::permissions::ActionType;

/// Claims carried by the session token. Tokens are issued elsewhere; this
/// crate only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    /// Claims for a new session. Together with [`JwtSessionData::sign`] this is
    /// for embedders that mint tokens for the shared secret, and for tests.
    pub fn new(id: i32, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }

    pub fn sign(&self, secret: &[u8]) -> Result<String, ServiceError> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret).map_err(|e| {
            log::error!("> Invalid session key: {e}");
            ServiceError::Unauthorized
        })?;

        self.sign_with_key(&key).map_err(|e| {
            log::error!("> Failed to sign session: {e}");
            ServiceError::Unauthorized
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ServiceError> {
        if !action.authenticate(self) {
            return Err(ServiceError::PermissionDenied);
        }
        Ok(())
    }

    /// Whether this session may mutate something owned by `owner_id`.
    pub fn owns_or_manages(&self, owner_id: i32, manage_all: ActionType) -> bool {
        self.user_id == owner_id || manage_all.authenticate(self)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, ServiceError> {
    let key: Hmac<Sha256> =
        Hmac::new_from_slice(secret).map_err(|_| ServiceError::Unauthorized)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        log::debug!("> Rejected session token: {e}");
        ServiceError::Unauthorized
    })?;

    if session.is_expired() {
        log::debug!("> Rejected expired session for user {}", session.user_id);
        return Err(ServiceError::Unauthorized);
    }

    Ok(session)
}
