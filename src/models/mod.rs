pub mod document;
pub mod loan;
pub mod reservation;
pub mod user;

pub use document::Document;
pub use loan::{LoanStatus, LoanView};
pub use reservation::{ReservationStatus, ReservationView};
pub use user::{Role, UserDto};
