//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{DocumentRepository, UserRepository};
use crate::infrastructure::{SeaOrmDocumentRepository, SeaOrmUserRepository};
use crate::services::lending_service::{LendingPolicy, LendingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Catalog repository
    pub document_repo: Arc<dyn DocumentRepository>,
    /// Members, employees and admins
    pub user_repo: Arc<dyn UserRepository>,
    /// Loan and reservation transitions
    pub lending: LendingService,
}

impl AppState {
    /// Create a new AppState with the default lending policy
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_policy(db, LendingPolicy::default())
    }

    pub fn with_policy(db: DatabaseConnection, policy: LendingPolicy) -> Self {
        let document_repo = Arc::new(SeaOrmDocumentRepository::new(db.clone()));
        let user_repo = Arc::new(SeaOrmUserRepository::new(db.clone()));
        let lending = LendingService::new(db.clone(), policy);

        Self {
            db,
            document_repo,
            user_repo,
            lending,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
