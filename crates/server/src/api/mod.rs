pub mod error;
pub mod handlers;
pub mod pose;
pub mod routes;
pub mod tasks;
pub mod uploads;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
