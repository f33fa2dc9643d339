use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::student::Role;

/// Signs an HS256 token for `student_id`. Tokens are normally minted by the
/// identity service; this is used by operators and tests.
pub fn issue_token(secret: &str, student_id: Uuid, role: Role, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: student_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        role: Some(role.as_str().to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("could not sign token: {}", e)))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized("invalid_token".to_string()))
}
