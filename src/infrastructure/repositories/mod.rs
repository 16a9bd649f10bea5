//! Repository implementations using SeaORM

pub mod document_repository;
pub mod user_repository;

pub use document_repository::SeaOrmDocumentRepository;
pub use user_repository::SeaOrmUserRepository;
