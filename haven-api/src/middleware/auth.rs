use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    http::{HeaderMap, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// `sub` is the opaque user id bookings are recorded under.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

pub const CUSTOMER_ROLE: &str = "CUSTOMER";
pub const ADMIN_ROLES: [&str; 2] = ["ADMIN", "SUPER_ADMIN"];

fn bearer_claims<T: DeserializeOwned>(headers: &HeaderMap, secret: &str) -> Result<T, StatusCode> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })
}

// ============================================================================
// Customer Authentication Middleware
// ============================================================================

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims: CustomerClaims = bearer_claims(req.headers(), &state.auth.secret)?;

    if claims.role != CUSTOMER_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims: AdminClaims = bearer_claims(req.headers(), &state.auth.secret)?;

    if !ADMIN_ROLES.contains(&claims.role.as_str()) {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", format!("Bearer {}", token).parse().unwrap());
        headers
    }

    fn token(role: &str, secret: &str) -> String {
        let claims = CustomerClaims {
            sub: "user-1".into(),
            email: None,
            role: role.into(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_token_yields_claims() {
        let claims: CustomerClaims = bearer_claims(&headers_with(&token("CUSTOMER", "s3cret")), "s3cret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, CUSTOMER_ROLE);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let result: Result<CustomerClaims, _> = bearer_claims(&headers_with(&token("CUSTOMER", "a")), "b");
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let result: Result<AdminClaims, _> = bearer_claims(&HeaderMap::new(), "s3cret");
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
