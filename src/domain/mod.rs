//! Domain layer - Business abstractions
//!
//! Trait definitions, the error taxonomy and role capabilities.
//! No HTTP types live here.

pub mod authorization;
pub mod errors;
pub mod repositories;

pub use authorization::{Capability, authorize, can};
pub use errors::DomainError;
pub use repositories::*;
