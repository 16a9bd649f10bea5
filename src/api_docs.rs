use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::loan::create_loan,
        api::loan::return_loan,
        api::reservation::create_reservation,
        api::reservation::fulfill_reservation,
        api::reservation::update_reservation_status,
    ),
    components(
        schemas(
            api::auth::LoginRequest,
            api::loan::CreateLoanRequest,
            api::reservation::CreateReservationRequest,
            api::reservation::UpdateReservationStatusRequest,
            crate::models::ReservationStatus,
        )
    ),
    tags(
        (name = "librarysphere", description = "LibrarySphere lending API")
    )
)]
pub struct ApiDoc;
