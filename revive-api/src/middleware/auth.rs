use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use revive_shared::models::Role;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn require(&self, role: Role) -> Result<Uuid, AppError> {
        if self.role != role {
            return Err(AppError::AuthorizationError(format!("requires the {} role", role)));
        }
        Ok(self.sub)
    }
}

/// Signs a token for `user_id`. Account registration and login live outside
/// this service; this is what they call to hand out bearer tokens.
pub fn issue_token(secret: &str, user_id: Uuid, role: Role, ttl: Duration) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (Utc::now() + ttl).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Bearer Authentication Middleware
// ============================================================================

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("invalid or expired token".to_string()))?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = issue_token("secret", user_id, Role::Reseller, Duration::minutes(5)).unwrap();

        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b"secret"), &Validation::default()).unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.require(Role::Reseller).unwrap(), user_id);
        assert!(data.claims.require(Role::Supplier).is_err());
    }
}
