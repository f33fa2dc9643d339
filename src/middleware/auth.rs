use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::token::decode_token;
use crate::AppState;

/// Legacy header carrying the raw token without a scheme.
const LEGACY_TOKEN_HEADER: &str = "auth-token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn student_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::Unauthorized("invalid_subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"))
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> std::result::Result<&str, Response> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let Ok(auth_str) = auth_header.to_str() else {
            return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
        };
        return auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    }
    match headers.get(LEGACY_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map(str::trim)
            .map_err(|_| reject(StatusCode::UNAUTHORIZED, "bad_authorization")),
        None => Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization")),
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> std::result::Result<Claims, Response> {
    let token = bearer_token(headers)?;
    let claims = decode_token(&state.jwt_secret, token)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))?;
    if claims.student_id().is_err() {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid_subject"));
    }
    Ok(claims)
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match authenticate(&state, req.headers()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()) {
        Ok(claims) if claims.is_admin() => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Ok(claims) => {
            tracing::warn!(sub = %claims.sub, "non-admin token on admin route");
            reject(StatusCode::FORBIDDEN, "forbidden")
        }
        Err(resp) => resp,
    }
}
