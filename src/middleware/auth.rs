use crate::config::JwtConfig;
use crate::entities::user::{Entity as UserEntity, Role};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Endpoint-level authorization rules. A request either passes as a whole
/// or is rejected before any entity access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessPolicy {
    IsAdmin,
    IsAdminOrManager,
    IsManager,
    IsCustomer,
}

impl AccessPolicy {
    pub fn allows(self, role: Role) -> bool {
        match self {
            AccessPolicy::IsAdmin => role == Role::Admin,
            AccessPolicy::IsAdminOrManager => matches!(role, Role::Admin | Role::Manager),
            AccessPolicy::IsManager => role == Role::Manager,
            AccessPolicy::IsCustomer => role == Role::Customer,
        }
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub tokens: Arc<TokenIssuer>,
    pub policy: AccessPolicy,
}

/// The authenticated caller, available to handlers as an extension.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.validate(token, TokenKind::Access).map_err(|err| {
        debug!(error = %err, "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    let user = UserEntity::find_by_id(claims.user_id)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !state.policy.allows(user.role) {
        warn!(
            user_id = user.id,
            role = %user.role,
            policy = ?state.policy,
            "Denied access"
        );
        return Err(ApiError::Forbidden);
    }

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        role: user.role,
    });
    Ok(next.run(req).await)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub token_type: TokenKind,
    pub exp: usize,
}

#[derive(Serialize, Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        TokenIssuer {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_ttl_secs),
        }
    }

    pub fn issue_pair(&self, user_id: i32) -> Result<TokenPair, AuthMiddlewareError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: i32, token_type: TokenKind) -> Result<String, AuthMiddlewareError> {
        let ttl = match token_type {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(AuthMiddlewareError::GenerationFail)?
            .timestamp() as usize;

        let claims = Claims {
            user_id,
            token_type,
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthMiddlewareError::GenerationFail)
    }

    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthMiddlewareError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthMiddlewareError::ValidationFail)?;

        if token_data.claims.token_type != expected {
            return Err(AuthMiddlewareError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Token has the wrong type")]
    WrongTokenType,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
}
