use std::future::{ready, Ready};

use actix_web::{http::header::AUTHORIZATION, web, FromRequest, HttpRequest};

use crate::{
    auth::{Claims, JwtService},
    errors::{AppError, AppResult},
};

/// Claims from a `Bearer` token, if the request carries a valid one.
pub fn bearer_claims(req: &HttpRequest, jwt_service: &JwtService) -> AppResult<Option<Claims>> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))?;

    jwt_service.validate_token(token).map(Some)
}

// Extractor for authenticated user in handlers
pub struct AuthenticatedUser(pub Claims);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let claims = req
            .app_data::<web::Data<JwtService>>()
            .ok_or_else(|| AppError::InternalError("JWT service not configured".to_string()))
            .and_then(|jwt_service| bearer_claims(req, jwt_service))
            .and_then(|claims| {
                claims.ok_or_else(|| {
                    AppError::Unauthorized("Missing authorization header".to_string())
                })
            });

        ready(claims.map(AuthenticatedUser))
    }
}
