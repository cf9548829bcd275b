use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use waymate_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Stateless check of a bearer token: signature and expiry only, no storage
/// round-trip.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("token is invalid or expired".into()))
}

/// Extract and validate the JWT from the Authorization header, then inject
/// the claims so handlers can resolve the acting user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("token is missing".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("invalid token format".into()))?;

    let claims = verify_token(&state.jwt_secret, token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use uuid::Uuid;

    #[test]
    fn token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", user_id, "alice").unwrap();

        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_token("secret", Uuid::new_v4(), "alice").unwrap();
        let err = verify_token("other-secret", &token).unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn garbage_token_rejected() {
        let err = verify_token("secret", "not-a-jwt").unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn expired_token_rejected() {
        use jsonwebtoken::{EncodingKey, Header, encode};
        use waymate_types::api::Claims;

        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let err = verify_token("secret", &token).unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }
}
