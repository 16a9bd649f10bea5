use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::LoanStatus;
use crate::services::LoanFilter;

#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    pub status: Option<LoanStatus>,
    pub member_id: Option<i32>,
    pub document_id: Option<i32>,
}

/// Request body for lending a document
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    pub document_id: i32,
    /// Required for staff; members borrow for themselves
    pub member_id: Option<i32>,
}

/// GET /api/loans - members see their own loans, staff see all
pub async fn list_loans(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListLoansQuery>,
) -> Result<impl IntoResponse, DomainError> {
    let filter = LoanFilter {
        status: query.status,
        member_id: query.member_id,
        document_id: query.document_id,
    };

    let loans = state.lending.list_loans(claims.actor(), filter).await?;
    let total = loans.len();
    Ok(Json(json!({ "loans": loans, "total": total })))
}

pub async fn get_loan(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let loan = state.lending.get_loan(claims.actor(), id).await?;
    Ok(Json(json!({ "loan": loan })))
}

#[utoipa::path(
    post,
    path = "/api/loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created with document and member summaries"),
        (status = 400, description = "Document on loan, or invalid request"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not borrow for this member"),
        (status = 404, description = "Document or member not found")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateLoanRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let loan = state
        .lending
        .create_loan(claims.actor(), payload.document_id, payload.member_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "loan": loan, "message": "Loan created successfully" })),
    ))
}

#[utoipa::path(
    put,
    path = "/api/loans/{id}/return",
    params(("id" = i32, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Loan marked returned"),
        (status = 400, description = "Loan already returned"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let loan = state.lending.return_loan(claims.actor(), id).await?;

    Ok(Json(json!({
        "loan": loan,
        "message": "Loan returned successfully"
    })))
}
