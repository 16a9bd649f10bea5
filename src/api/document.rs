//! Catalog API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Claims;
use crate::domain::{
    Capability, CreateDocumentInput, DocumentFilter, DomainError, UpdateDocumentInput,
};
use crate::infrastructure::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub document_type: Option<String>,
    pub available: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// Browse the catalog; open to anonymous visitors
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    let filter = DocumentFilter {
        query: query.q,
        category: query.category,
        document_type: query.document_type,
        available: query.available,
        page: query.page,
        limit: query.limit,
    };

    let result = state.document_repo.find_all(filter).await?;
    Ok(Json(json!({
        "documents": result.documents,
        "total": result.total
    })))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let document = state
        .document_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Document"))?;

    Ok(Json(json!({ "document": document })))
}

pub async fn create_document(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateDocumentInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Capability::ManageCatalog)?;

    let document = state.document_repo.create(payload).await?;
    tracing::info!(document_id = ?document.id, code = %document.code, "Document created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "document": document,
            "message": "Document created successfully"
        })),
    ))
}

pub async fn update_document(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDocumentInput>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Capability::ManageCatalog)?;

    let document = state.document_repo.update(id, payload).await?;
    Ok(Json(json!({ "document": document })))
}

pub async fn delete_document(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    claims.require(Capability::ManageCatalog)?;

    state.document_repo.delete(id).await?;
    tracing::info!(document_id = id, "Document deleted");

    Ok(Json(json!({ "message": "Document deleted successfully" })))
}
