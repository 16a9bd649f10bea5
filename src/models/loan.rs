use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::document::DocumentSummary;
use super::user::UserSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "returned")]
    Returned,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub document_id: i32,
    pub member_id: i32,
    pub loan_date: String,
    pub expected_return_date: String,
    /// Set exactly when status is `returned`
    pub actual_return_date: Option<String>,
    pub status: LoanStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Document,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::MemberId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Member,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Loan enriched with document and member summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanView {
    pub id: i32,
    pub document_id: i32,
    pub member_id: i32,
    pub loan_date: String,
    pub expected_return_date: String,
    pub actual_return_date: Option<String>,
    pub status: LoanStatus,
    pub is_overdue: bool,
    pub document: Option<DocumentSummary>,
    pub member: Option<UserSummary>,
}
