use axum::{extract::State, routing::post, Json, Router};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/token", post(issue_token))
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    user_id: Uuid,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "customer".to_string()
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    expires_in: u64,
}

/// Mock token issuance; a real deployment delegates to the identity service.
async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let exp = chrono::Utc::now().timestamp() as usize + state.auth.expiration as usize;
    let claims = Claims {
        sub: req.user_id.to_string(),
        role: req.role,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(TokenResponse {
        token,
        expires_in: state.auth.expiration,
    }))
}

pub fn authenticate(state: &AppState, token: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;
    Ok(data.claims)
}

pub fn subject_user(claims: &Claims) -> Result<Uuid, AppError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("invalid subject claim".to_string()))
}

/// Ownership check at the HTTP boundary: the caller must own the resource
/// unless it carries the admin role.
pub fn require_owner(claims: &Claims, owner: Uuid) -> Result<(), AppError> {
    let caller = subject_user(claims)?;
    if caller != owner && !claims.is_admin() {
        return Err(AppError::AuthorizationError(
            "resource does not belong to you".to_string(),
        ));
    }
    Ok(())
}
