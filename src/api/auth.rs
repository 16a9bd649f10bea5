use crate::api::user::hash_new_password;
use crate::auth::{Claims, create_jwt, verify_password};
use crate::domain::{CreateUserInput, DomainError};
use crate::infrastructure::AppState;
use crate::models::Role;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    phone: Option<String>,
    address: Option<String>,
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized("Invalid credentials".to_string())
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed token and profile"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    tracing::info!("Login attempt for user: {}", payload.email);

    let Some((user, password_hash)) = state.user_repo.find_credentials(&payload.email).await?
    else {
        tracing::warn!("User not found: {}", payload.email);
        return Err(invalid_credentials());
    };

    match verify_password(&payload.password, &password_hash) {
        Ok(true) => {
            tracing::info!("Password verified successfully for user: {}", user.email);
            let token =
                create_jwt(&user.email, user.id, user.role).map_err(DomainError::Internal)?;
            Ok(Json(json!({ "token": token, "user": user })))
        }
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.email);
            Err(invalid_credentials())
        }
    }
}

/// Member self-registration
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let input = CreateUserInput {
        code: None,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        password_hash: hash_new_password(&payload.password)?,
        role: Role::Member,
    };

    let user = state.user_repo.create(input).await?;
    let token = create_jwt(&user.email, user.id, user.role).map_err(DomainError::Internal)?;
    tracing::info!(user_id = user.id, "Member registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user })),
    ))
}

pub async fn get_me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    let user = state
        .user_repo
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| DomainError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(json!({ "user": user })))
}
