//! Services Layer
//!
//! Business logic extracted from HTTP handlers.

pub mod lending_service;

pub use lending_service::{
    Actor, Fulfillment, LendingPolicy, LendingService, LoanFilter, ReservationFilter,
};
