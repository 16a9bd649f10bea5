pub mod auth;
pub mod document;
pub mod error;
pub mod health;
pub mod loan;
pub mod reservation;
pub mod user;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::get_me))
        // Catalog
        .route(
            "/documents",
            get(document::list_documents).post(document::create_document),
        )
        .route(
            "/documents/:id",
            get(document::get_document)
                .put(document::update_document)
                .delete(document::delete_document),
        )
        // Members and staff
        .route("/users", get(user::list_users).post(user::create_user))
        .route(
            "/users/:id",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        // Lending
        .route("/loans", get(loan::list_loans).post(loan::create_loan))
        .route("/loans/:id", get(loan::get_loan))
        .route("/loans/:id/return", put(loan::return_loan))
        .route(
            "/reservations",
            get(reservation::list_reservations).post(reservation::create_reservation),
        )
        .route("/reservations/:id", get(reservation::get_reservation))
        .route(
            "/reservations/:id/fulfill",
            post(reservation::fulfill_reservation),
        )
        .route(
            "/reservations/:id/status",
            put(reservation::update_reservation_status),
        )
        .with_state(state)
}
