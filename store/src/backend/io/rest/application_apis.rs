//! # REST API for Enrollment Applications
//!
//! Applications are created `PENDING` and can be approved or rejected once.
//! A rejected status change answers `409 Conflict`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{CreatedResponse, NewApplication, SetStatusRequest};
use tracing::info;

use super::error_response;
use crate::backend::AppState;

pub async fn create_application(
    State(state): State<AppState>,
    Json(request): Json<NewApplication>,
) -> impl IntoResponse {
    info!("POST /api/applications - request: {:?}", request);

    match state.store.create_application(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => error_response("create application", e),
    }
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/applications/{}", application_id);

    match state.store.get_application(application_id).await {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(e) => error_response("get application", e),
    }
}

/// Approve or reject, returning the updated application
pub async fn set_application_status(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(request): Json<SetStatusRequest>,
) -> impl IntoResponse {
    info!("PUT /api/applications/{}/status - status={}", application_id, request.status);

    match state.store.set_application_status(application_id, request.status).await {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(e) => error_response("set application status", e),
    }
}

/// Applications filed by one user
pub async fn get_user_applications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/users/{}/applications", user_id);

    match state.store.get_applications_for_user(user_id).await {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(e) => error_response("list user applications", e),
    }
}

pub async fn get_club_applications(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/clubs/{}/applications", club_id);

    match state.store.get_applications_for_club(club_id).await {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(e) => error_response("list club applications", e),
    }
}

/// Applications to any club the organizer owns
pub async fn get_organizer_applications(
    State(state): State<AppState>,
    Path(organizer_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/organizers/{}/applications", organizer_id);

    match state.store.get_applications_for_clubs_owned_by(organizer_id).await {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(e) => error_response("list organizer applications", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{parse, router_for, send};
    use crate::backend::test_utils::{new_club, TestEnvironment};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use shared::{Application, ApplicationStatus, CreatedResponse, ErrorResponse};

    #[tokio::test]
    async fn test_application_decided_once() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Хор")).await.unwrap();

        let body = json!({ "club_id": club, "user_id": parent, "message": "Хотим записаться" });
        let (status, bytes) = send(&router, Method::POST, "/api/applications", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: CreatedResponse = parse(&bytes);

        let uri = format!("/api/applications/{}/status", created.id);
        let (status, bytes) = send(&router, Method::PUT, &uri, Some(json!({ "status": "APPROVED" }))).await;
        assert_eq!(status, StatusCode::OK);
        let application: Application = parse(&bytes);
        assert_eq!(application.status, ApplicationStatus::Approved);

        let (status, bytes) = send(&router, Method::PUT, &uri, Some(json!({ "status": "REJECTED" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorResponse = parse(&bytes);
        assert_eq!(error.error, "invalid_transition");

        let (_, bytes) = send(&router, Method::GET, &format!("/api/organizers/{organizer}/applications"), None).await;
        let inbox: Vec<Application> = parse(&bytes);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].status, ApplicationStatus::Approved);

        let (_, bytes) = send(&router, Method::GET, &format!("/api/users/{parent}/applications"), None).await;
        let mine: Vec<Application> = parse(&bytes);
        assert_eq!(mine.len(), 1);

        let (_, bytes) = send(&router, Method::GET, &format!("/api/clubs/{club}/applications"), None).await;
        let for_club: Vec<Application> = parse(&bytes);
        assert_eq!(for_club[0].id, created.id);
    }

    #[tokio::test]
    async fn test_application_for_missing_club() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let parent = env.parent().await;

        let body = json!({ "club_id": 777, "user_id": parent });
        let (status, _) = send(&router, Method::POST, "/api/applications", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&router, Method::GET, "/api/applications/777", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
