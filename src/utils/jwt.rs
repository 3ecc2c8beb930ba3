// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::Role};

/// Claims issued by the identity provider.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the provider's user id.
    pub sub: String,
    /// 'student', 'mentor' or 'admin'. Anything else is treated as a student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::from_claim(self.role.as_deref())
    }
}

/// Who is calling. Inserted into request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(Claims),
}

impl Identity {
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(claims) => Some(claims),
        }
    }
}

/// Signs a token the way the identity provider does.
/// Used by tests and local tooling; production tokens come from the provider.
pub fn sign_jwt(
    sub: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: sub.to_owned(),
        role: Some(role.as_str().to_owned()),
        email: None,
        name: None,
        iss: None,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str, issuer: Option<&str>) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    if let Some(iss) = issuer {
        // `set_issuer` alone lets tokens without `iss` through.
        validation.set_issuer(&[iss]);
        validation.set_required_spec_claims(&["exp", "iss"]);
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized("Invalid token".to_string()));
    }

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// No 'Authorization' header means an anonymous request.
/// A 'Bearer <token>' header must verify, otherwise the request stops with 401.
/// The resulting `Identity` is injected into the request extensions.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default().to_owned());

    let identity = match auth_header {
        None => Identity::Anonymous,
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))?;
            let claims =
                verify_jwt(token.trim(), &config.jwt_secret, config.jwt_issuer.as_deref())?;
            Identity::Authenticated(claims)
        }
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit_test_secret";

    #[test]
    fn test_sign_and_verify() {
        let token = sign_jwt("user_2abc", Role::Mentor, SECRET, 60).unwrap();
        let claims = verify_jwt(&token, SECRET, None).unwrap();
        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.role(), Role::Mentor);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt("user_1", Role::Student, SECRET, 60).unwrap();
        let err = verify_jwt(&token, "other", None).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    fn token_with_issuer(iss: &str) -> String {
        let claims = Claims {
            sub: "user_1".into(),
            role: Some("admin".into()),
            email: None,
            name: None,
            iss: Some(iss.into()),
            // 2100-01-01.
            exp: 4_102_444_800,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let token = sign_jwt("user_1", Role::Student, SECRET, 60).unwrap();
        assert!(verify_jwt(&token, SECRET, Some("https://clerk.example")).is_err());
    }

    #[test]
    fn test_token_without_issuer_is_rejected_when_issuer_required() {
        let token = sign_jwt("user_1", Role::Admin, SECRET, 60).unwrap();
        let err = verify_jwt(&token, SECRET, Some("https://issuer.example")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_issuer_must_match() {
        let good = token_with_issuer("https://issuer.example");
        let claims = verify_jwt(&good, SECRET, Some("https://issuer.example")).unwrap();
        assert_eq!(claims.role(), Role::Admin);

        let other = token_with_issuer("https://elsewhere.example");
        assert!(verify_jwt(&other, SECRET, Some("https://issuer.example")).is_err());
    }

    #[test]
    fn test_unknown_role_falls_back_to_student() {
        let claims = Claims {
            sub: "u".into(),
            role: Some("superuser".into()),
            email: None,
            name: None,
            iss: None,
            exp: 0,
        };
        assert_eq!(claims.role(), Role::Student);
    }
}
