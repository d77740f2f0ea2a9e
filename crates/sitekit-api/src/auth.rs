//! Bearer-token caller extraction
//!
//! Tokens are only decoded here; issuance and refresh live elsewhere.
//! A missing or invalid token degrades to the anonymous caller so public
//! read routes keep working; mutating routes then fail their permission
//! check with 401.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use sitekit_core::domain::CallerContext;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

pub fn caller_from_bearer(token: &str, secret: &str) -> CallerContext {
    let data = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data,
        Err(e) => {
            warn!("Rejected bearer token: {}", e);
            return CallerContext::anonymous();
        }
    };

    match Uuid::parse_str(&data.claims.sub) {
        Ok(user_id) => {
            CallerContext::authenticated(user_id, data.claims.role, data.claims.permissions)
        }
        Err(_) => {
            warn!("Bearer token subject is not a uuid");
            CallerContext::anonymous()
        }
    }
}

/// Extractor wrapping the resolved caller context.
pub struct Caller(pub CallerContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| caller_from_bearer(token, &state.config.auth.jwt_secret))
            .unwrap_or_else(CallerContext::anonymous);
        Ok(Caller(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token_for(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn test_valid_token_yields_authenticated_caller() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            role: Some("Admin".to_string()),
            permissions: vec!["pages:manage".to_string()],
        };

        let caller = caller_from_bearer(&token_for(&claims), SECRET);
        assert_eq!(caller.user_id, Some(user_id));
        assert_eq!(caller.role.as_deref(), Some("Admin"));
        assert!(caller.has_permission("pages:manage"));
    }

    #[test]
    fn test_bad_signature_yields_anonymous() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            role: None,
            permissions: Vec::new(),
        };
        let caller = caller_from_bearer(&token_for(&claims), "other-secret");
        assert!(!caller.is_authenticated());
    }

    #[test]
    fn test_expired_token_yields_anonymous() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
            role: None,
            permissions: Vec::new(),
        };
        let caller = caller_from_bearer(&token_for(&claims), SECRET);
        assert!(!caller.is_authenticated());
    }
}
