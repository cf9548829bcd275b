use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use waymate_db::{Database, StoreError};
use waymate_types::api::{AuthResponse, Claims, LoginRequest, SignupRequest};
use waymate_types::models::User;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    if username.is_empty() || email.is_empty() || req.password.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "username, email and password are required".into(),
        ));
    }

    if state.db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::Conflict("username already exists".into()));
    }
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("email already exists".into()));
    }

    // Hash password with Argon2id; plaintext never reaches storage.
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    let user_id = Uuid::new_v4();

    // The UNIQUE indexes on username/email decide concurrent duplicate
    // signups: exactly one writer succeeds, the rest land here.
    state
        .db
        .create_user(&user_id.to_string(), &username, &email, &password_hash)
        .map_err(|e| match e {
            StoreError::Duplicate => ApiError::Conflict("username or email already exists".into()),
            other => other.into(),
        })?;

    let token = create_token(&state.jwt_secret, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: User {
                id: user_id,
                username,
                email,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Same error for unknown username and wrong password: a caller must not
    // learn which one failed.
    let uniform = || ApiError::Unauthorized("invalid username or password".into());

    let user = state
        .db
        .get_user_by_username(req.username.trim())?
        .ok_or_else(uniform)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| uniform())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {e}", user.id)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(AuthResponse {
        token,
        user: User {
            id: user_id,
            username: user.username,
            email: user.email,
        },
    }))
}

pub(crate) fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
