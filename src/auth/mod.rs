use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Operation;

/// Access level carried in the token's `access` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Edit,
    Full,
    Root,
}

impl AccessLevel {
    pub fn permits(&self, operation: Operation) -> bool {
        match operation {
            Operation::ViewEntity => true,
            Operation::EditProfile => *self >= AccessLevel::Edit,
        }
    }
}

impl FromStr for AccessLevel {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessLevel::Read),
            "edit" => Ok(AccessLevel::Edit),
            "full" => Ok(AccessLevel::Full),
            "root" => Ok(AccessLevel::Root),
            other => Err(AuthError::Forbidden(format!("unknown access level '{}'", other))),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessLevel::Read => "read",
            AccessLevel::Edit => "edit",
            AccessLevel::Full => "full",
            AccessLevel::Root => "root",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub access: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, access: AccessLevel, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: subject.into(),
            access: access.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Caller identity established by an [`Authorizer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub access: AccessLevel,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            access: AccessLevel::Root,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Pass/fail gate evaluated before any handler touches the service.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, bearer: Option<&str>, operation: Operation) -> Result<Principal, AuthError>;
}

/// Lets every request through. Used when `SECURITY_AUTH_MODE=disabled`.
pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn authorize(&self, _bearer: Option<&str>, _operation: Operation) -> Result<Principal, AuthError> {
        Ok(Principal::anonymous())
    }
}

/// Validates HS256 bearer tokens and checks the `access` claim against the
/// requested operation.
pub struct JwtAuthorizer {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthorizer {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        })
    }
}

impl Authorizer for JwtAuthorizer {
    fn authorize(&self, bearer: Option<&str>, operation: Operation) -> Result<Principal, AuthError> {
        let token = bearer.ok_or_else(|| AuthError::Unauthorized("Missing Authorization header".to_string()))?;

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Unauthorized(format!("Invalid JWT token: {}", e)))?
            .claims;

        let access: AccessLevel = claims.access.parse()?;
        if !access.permits(operation) {
            return Err(AuthError::Forbidden(format!(
                "access level '{}' does not permit {}",
                access,
                operation.as_str()
            )));
        }

        Ok(Principal {
            subject: claims.sub,
            access,
        })
    }
}

pub fn generate_jwt(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}
