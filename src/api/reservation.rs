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
use crate::models::ReservationStatus;
use crate::services::ReservationFilter;

#[derive(Debug, Deserialize)]
pub struct ListReservationsQuery {
    pub status: Option<ReservationStatus>,
    pub member_id: Option<i32>,
    pub document_id: Option<i32>,
}

/// Request body for reserving a document that is on loan
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub document_id: i32,
    /// Required for staff; members reserve for themselves
    pub member_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservationStatusRequest {
    pub status: ReservationStatus,
}

pub async fn list_reservations(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListReservationsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    let filter = ReservationFilter {
        status: query.status,
        member_id: query.member_id,
        document_id: query.document_id,
    };

    let reservations = state
        .lending
        .list_reservations(claims.actor(), filter)
        .await?;
    let total = reservations.len();
    Ok(Json(json!({ "reservations": reservations, "total": total })))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let reservation = state.lending.get_reservation(claims.actor(), id).await?;
    Ok(Json(json!({ "reservation": reservation })))
}

#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created"),
        (status = 400, description = "Document available, already reserved, or held by the member"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not reserve for this member"),
        (status = 404, description = "Document or member not found")
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let reservation = state
        .lending
        .create_reservation(claims.actor(), payload.document_id, payload.member_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reservation": reservation,
            "message": "Reservation created successfully"
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/fulfill",
    params(("id" = i32, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Loan created and reservation fulfilled"),
        (status = 400, description = "Reservation not pending, or document still on loan"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let fulfillment = state.lending.fulfill_reservation(claims.actor(), id).await?;

    Ok(Json(json!({
        "loan": fulfillment.loan,
        "reservation": fulfillment.reservation,
    })))
}

#[utoipa::path(
    put,
    path = "/api/reservations/{id}/status",
    params(("id" = i32, Path, description = "Reservation id")),
    request_body = UpdateReservationStatusRequest,
    responses(
        (status = 200, description = "Reservation updated"),
        (status = 400, description = "Transition not allowed"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation_status(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateReservationStatusRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let reservation = state
        .lending
        .update_reservation_status(claims.actor(), id, payload.status)
        .await?;

    Ok(Json(json!({ "reservation": reservation })))
}
