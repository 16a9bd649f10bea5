//! Member and employee management

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{Claims, hash_password};
use crate::domain::authorization::capability_for_account;
use crate::domain::{
    Capability, CreateUserInput, DomainError, UpdateUserInput, deserialize_some,
};
use crate::infrastructure::AppState;
use crate::models::Role;

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn hash_new_password(password: &str) -> Result<String, DomainError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    hash_password(password).map_err(DomainError::Internal)
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub address: Option<Option<String>>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Capability::ManageMembers)?;

    let users = state.user_repo.find_all(query.role).await?;
    let total = users.len();
    Ok(Json(json!({ "users": users, "total": total })))
}

pub async fn get_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    if claims.user_id != id {
        claims.require(Capability::ManageMembers)?;
    }

    let user = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("User"))?;

    Ok(Json(json!({ "user": user })))
}

pub async fn create_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let role = payload.role.unwrap_or(Role::Member);
    claims.require(capability_for_account(role))?;

    let input = CreateUserInput {
        code: payload.code,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        password_hash: hash_new_password(&payload.password)?,
        role,
    };

    let user = state.user_repo.create(input).await?;
    tracing::info!(user_id = user.id, role = role.as_str(), "Account created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": user, "message": "User created successfully" })),
    ))
}

/// Users may edit their own profile; changing anyone's role, or editing
/// someone else, needs the capability for the roles involved.
pub async fn update_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let target = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("User"))?;

    if claims.user_id != id {
        claims.require(capability_for_account(target.role))?;
    }
    if let Some(role) = payload.role
        && role != target.role
    {
        claims.require(Capability::ManageStaff)?;
    }

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash_new_password(password)?),
        None => None,
    };

    let input = UpdateUserInput {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        password_hash,
        role: payload.role,
    };

    let user = state.user_repo.update(id, input).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    if claims.user_id == id {
        return Err(DomainError::Validation(
            "you cannot delete your own account".to_string(),
        ));
    }

    let target = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("User"))?;
    claims.require(capability_for_account(target.role))?;

    state.user_repo.delete(id).await?;
    tracing::info!(user_id = id, "Account deleted");

    Ok(Json(json!({ "message": "User deleted" })))
}
