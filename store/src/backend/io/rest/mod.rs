//! # REST API Interface Layer
//!
//! Provides HTTP endpoints over the club directory store.
//! This layer handles:
//! - JSON request/response serialization
//! - Translation of store errors to HTTP status codes
//! - Request logging
//!
//! Handlers hold no business logic; every rule lives in the domain layer.

pub mod application_apis;
pub mod child_apis;
pub mod club_apis;
pub mod favorite_apis;
pub mod review_apis;
pub mod user_apis;

pub use application_apis::*;
pub use child_apis::*;
pub use club_apis::*;
pub use favorite_apis::*;
pub use review_apis::*;
pub use user_apis::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;
use tracing::{error, warn};

use crate::backend::domain::StoreError;

/// HTTP status for a store error
pub fn status_for(e: &StoreError) -> StatusCode {
    match e {
        StoreError::Validation { .. } => StatusCode::BAD_REQUEST,
        StoreError::Referential { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Duplicate { .. } | StoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StoreError::Database(_) | StoreError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log a failed request and render the error body
pub(crate) fn error_response(action: &str, e: StoreError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("Failed to {}: {}", action, e);
    } else {
        warn!("Failed to {}: {}", action, e);
    }

    let body = ErrorResponse {
        error: e.kind().to_string(),
        message: e.to_string(),
    };
    (status, Json(body)).into_response()
}


#[cfg(test)]
mod tests {
    use super::*;
    use shared::ApplicationStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&StoreError::validation("rating", "out of range")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&StoreError::Referential { entity: "club", id: 1 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&StoreError::NotFound { entity: "club", id: 1 }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&StoreError::InvalidTransition {
                from: ApplicationStatus::Approved,
                to: ApplicationStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&StoreError::Aborted("create_club")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
