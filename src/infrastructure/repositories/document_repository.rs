//! SeaORM implementation of DocumentRepository

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
};

use crate::domain::{
    CreateDocumentInput, DocumentFilter, DocumentRepository, DomainError, PaginatedDocuments,
    UpdateDocumentInput,
};
use crate::models::document::{ActiveModel, Column, Entity as DocumentEntity};
use crate::models::loan::{self, Entity as LoanEntity};
use crate::models::reservation::{self, Entity as ReservationEntity};
use crate::models::{Document, LoanStatus, ReservationStatus};

/// SeaORM-based implementation of DocumentRepository
pub struct SeaOrmDocumentRepository {
    db: DatabaseConnection,
}

impl SeaOrmDocumentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ids among `ids` with an active loan, and ids with a pending reservation
    async fn lending_flags(&self, ids: &[i32]) -> Result<(HashSet<i32>, HashSet<i32>), DomainError> {
        if ids.is_empty() {
            return Ok((HashSet::new(), HashSet::new()));
        }

        let on_loan: HashSet<i32> = LoanEntity::find()
            .filter(loan::Column::DocumentId.is_in(ids.to_vec()))
            .filter(loan::Column::Status.eq(LoanStatus::Active))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.document_id)
            .collect();

        let reserved: HashSet<i32> = ReservationEntity::find()
            .filter(reservation::Column::DocumentId.is_in(ids.to_vec()))
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.document_id)
            .collect();

        Ok((on_loan, reserved))
    }

    async fn to_dto(&self, model: crate::models::document::Model) -> Result<Document, DomainError> {
        let (on_loan, reserved) = self.lending_flags(&[model.id]).await?;
        let id = model.id;
        Ok(Document::from_model(
            model,
            !on_loan.contains(&id),
            reserved.contains(&id),
        ))
    }
}

fn validate_required(code: &str, title: &str) -> Result<(), DomainError> {
    if code.trim().is_empty() || title.trim().is_empty() {
        return Err(DomainError::Validation(
            "code and title are required".to_string(),
        ));
    }
    Ok(())
}

fn active_loan_documents() -> sea_orm::sea_query::SelectStatement {
    LoanEntity::find()
        .select_only()
        .column(loan::Column::DocumentId)
        .filter(loan::Column::Status.eq(LoanStatus::Active))
        .into_query()
}

#[async_trait]
impl DocumentRepository for SeaOrmDocumentRepository {
    async fn find_all(&self, filter: DocumentFilter) -> Result<PaginatedDocuments, DomainError> {
        let mut query = DocumentEntity::find();

        if let Some(q) = &filter.query
            && !q.is_empty()
        {
            let cond = Condition::any()
                .add(Column::Title.contains(q.as_str()))
                .add(Column::Author.contains(q.as_str()))
                .add(Column::Code.contains(q.as_str()));
            query = query.filter(cond);
        }

        if let Some(category) = &filter.category
            && !category.is_empty()
        {
            query = query.filter(Column::Category.eq(category.as_str()));
        }

        if let Some(document_type) = &filter.document_type
            && !document_type.is_empty()
        {
            query = query.filter(Column::DocumentType.eq(document_type.as_str()));
        }

        match filter.available {
            Some(true) => query = query.filter(Column::Id.not_in_subquery(active_loan_documents())),
            Some(false) => query = query.filter(Column::Id.in_subquery(active_loan_documents())),
            None => {}
        }

        query = query.order_by_asc(Column::Title);

        let (documents, total) = if let Some(limit) = filter.limit {
            let page = filter.page.unwrap_or(0);
            let paginator = query.paginate(&self.db, limit.max(1));
            let total = paginator.num_items().await?;
            let items = paginator.fetch_page(page).await?;
            (items, total)
        } else {
            let items = query.all(&self.db).await?;
            let total = items.len() as u64;
            (items, total)
        };

        let ids: Vec<i32> = documents.iter().map(|d| d.id).collect();
        let (on_loan, reserved) = self.lending_flags(&ids).await?;

        let documents = documents
            .into_iter()
            .map(|d| {
                let id = d.id;
                Document::from_model(d, !on_loan.contains(&id), reserved.contains(&id))
            })
            .collect();

        Ok(PaginatedDocuments { documents, total })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Document>, DomainError> {
        match DocumentEntity::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(self.to_dto(model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: CreateDocumentInput) -> Result<Document, DomainError> {
        validate_required(&input.code, &input.title)?;

        let now = chrono::Utc::now().to_rfc3339();
        let new_document = ActiveModel {
            code: Set(input.code.trim().to_string()),
            title: Set(input.title),
            author: Set(input.author),
            year: Set(input.year),
            category: Set(input.category),
            document_type: Set(input.document_type),
            age_classification: Set(input.age_classification),
            description: Set(input.description),
            isbn: Set(input.isbn),
            image_url: Set(input.image_url),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_document
            .insert(&self.db)
            .await
            .map_err(|e| DomainError::from_write(e, "A document with this code already exists"))?;

        Ok(Document::from_model(result, true, false))
    }

    async fn update(&self, id: i32, input: UpdateDocumentInput) -> Result<Document, DomainError> {
        let existing = DocumentEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Document"))?;

        validate_required(
            input.code.as_deref().unwrap_or(&existing.code),
            input.title.as_deref().unwrap_or(&existing.title),
        )?;

        let mut active: ActiveModel = existing.into();

        if let Some(code) = input.code {
            active.code = Set(code.trim().to_string());
        }
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(author) = input.author {
            active.author = Set(author);
        }
        if let Some(year) = input.year {
            active.year = Set(year);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(document_type) = input.document_type {
            active.document_type = Set(document_type);
        }
        if let Some(age) = input.age_classification {
            active.age_classification = Set(age);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(isbn) = input.isbn {
            active.isbn = Set(isbn);
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(image_url);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active
            .update(&self.db)
            .await
            .map_err(|e| DomainError::from_write(e, "A document with this code already exists"))?;

        self.to_dto(result).await
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let loans = LoanEntity::find()
            .filter(loan::Column::DocumentId.eq(id))
            .count(&self.db)
            .await?;
        let reservations = ReservationEntity::find()
            .filter(reservation::Column::DocumentId.eq(id))
            .count(&self.db)
            .await?;

        if loans > 0 || reservations > 0 {
            return Err(DomainError::Conflict(
                "Document is referenced by loans or reservations".to_string(),
            ));
        }

        let result = DocumentEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Document"));
        }

        Ok(())
    }
}
