/// Identity extraction for the blog service
///
/// The identity provider is external: callers present a Bearer token whose
/// claims carry `{sub, is_staff, is_superuser}`. Handlers pull the caller
/// out of the request with two extractors:
///
/// - [`CurrentUser`] rejects unauthenticated requests with 401.
/// - [`MaybeUser`] yields `None` when no token is presented, for endpoints
///   that serve public posts to anonymous callers.
use actix_web::{web, Error, FromRequest, HttpRequest};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Identity;

/// Claims carried by the identity token
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    is_superuser: bool,
    #[allow(dead_code)]
    exp: usize,
}

/// Validates identity tokens; shared as actix app data.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn decode(&self, token: &str) -> Result<Identity, AppError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::AuthRequired("invalid or expired token".to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::AuthRequired("invalid user id in token".to_string()))?;

        Ok(Identity {
            id,
            is_staff: data.claims.is_staff,
            is_superuser: data.claims.is_superuser,
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn identity_from_request(req: &HttpRequest) -> Result<Option<Identity>, AppError> {
    let token = match bearer_token(req) {
        Some(token) => token,
        None => return Ok(None),
    };

    let validator = req
        .app_data::<web::Data<TokenValidator>>()
        .ok_or_else(|| AppError::Internal("token validator not configured".to_string()))?;

    validator.decode(token).map(Some)
}

/// The authenticated caller; requests without a valid token are rejected.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = match identity_from_request(req) {
            Ok(Some(identity)) => Ok(CurrentUser(identity)),
            Ok(None) => Err(AppError::AuthRequired("missing bearer token".to_string()).into()),
            Err(err) => Err(err.into()),
        };
        ready(result)
    }
}

/// The caller if authenticated; anonymous requests yield `None`.
/// A presented-but-invalid token is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Identity>);

impl FromRequest for MaybeUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            identity_from_request(req)
                .map(MaybeUser)
                .map_err(Into::into),
        )
    }
}
