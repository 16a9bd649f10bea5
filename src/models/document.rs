use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub category: String,
    /// Book, magazine, DVD... free text chosen by staff.
    pub document_type: String,
    /// Audience rating, e.g. `all`, `12+`, `adult`.
    pub age_classification: String,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<i32>,
    pub code: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub category: String,
    pub document_type: String,
    pub age_classification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// No active loan exists for this document
    pub available: bool,
    /// A pending reservation holds the single waitlist slot
    pub reserved: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Document {
    pub fn from_model(model: Model, available: bool, reserved: bool) -> Self {
        Self {
            id: Some(model.id),
            code: model.code,
            title: model.title,
            author: model.author,
            year: model.year,
            category: model.category,
            document_type: model.document_type,
            age_classification: model.age_classification,
            description: model.description,
            isbn: model.isbn,
            image_url: model.image_url,
            available,
            reserved,
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        }
    }
}

/// Short form embedded in loan and reservation payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i32,
    pub code: String,
    pub title: String,
}

impl From<&Model> for DocumentSummary {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            code: model.code.clone(),
            title: model.title.clone(),
        }
    }
}
