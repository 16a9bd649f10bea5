//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use super::DomainError;
use crate::models::{Document, Role, UserDto};

/// Filter criteria for catalog queries
#[derive(Debug, Default, Clone)]
pub struct DocumentFilter {
    /// Matches title, author or code
    pub query: Option<String>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    pub available: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Paginated result with total count
#[derive(Debug)]
pub struct PaginatedDocuments {
    pub documents: Vec<Document>,
    pub total: u64,
}

/// Input for creating a document
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentInput {
    pub code: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub category: String,
    pub document_type: String,
    pub age_classification: String,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub image_url: Option<String>,
}

/// Input for updating a document; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentInput {
    pub code: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub year: Option<Option<i32>>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    pub age_classification: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
}

/// Distinguishes an explicit `null` (clear the field) from an absent key.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Repository trait for Document entity
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Find all documents matching the filter criteria with pagination support
    async fn find_all(&self, filter: DocumentFilter) -> Result<PaginatedDocuments, DomainError>;

    /// Find a single document by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Document>, DomainError>;

    /// Create a new document
    async fn create(&self, input: CreateDocumentInput) -> Result<Document, DomainError>;

    /// Update an existing document
    async fn update(&self, id: i32, input: UpdateDocumentInput) -> Result<Document, DomainError>;

    /// Delete a document that no loan or reservation references
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Input for creating an account
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Input for updating an account
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// Repository trait for members, employees and admins
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// List accounts, optionally restricted to one role
    async fn find_all(&self, role: Option<Role>) -> Result<Vec<UserDto>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<UserDto>, DomainError>;

    /// Lookup for login; returns the stored password hash alongside the profile
    async fn find_credentials(&self, email: &str)
    -> Result<Option<(UserDto, String)>, DomainError>;

    async fn create(&self, input: CreateUserInput) -> Result<UserDto, DomainError>;

    async fn update(&self, id: i32, input: UpdateUserInput) -> Result<UserDto, DomainError>;

    /// Delete an account that no loan or reservation references
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}
