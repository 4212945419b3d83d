//! # REST API for User Management
//!
//! Endpoints for registering, looking up, updating and deleting users,
//! plus phone/password login and the role capability set.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{capabilities_for, CreatedResponse, LoginRequest, NewUser, User};
use tracing::{info, warn};

use super::error_response;
use crate::backend::AppState;

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> impl IntoResponse {
    info!("POST /api/users - role={}, phone={}", request.role, request.phone);

    match state.store.create_user(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => error_response("create user", e),
    }
}

/// List every user
pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/users");

    match state.store.get_all_users().await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => error_response("list users", e),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/users/{}", user_id);

    match state.store.get_user(user_id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => error_response("get user", e),
    }
}

/// Look a user up by phone number
pub async fn get_user_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/users/by-phone/{}", phone);

    match state.store.find_user_by_phone(&phone).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => error_response("find user by phone", e),
    }
}

/// Replace a user. The id in the path wins over the body.
///
/// Passwords are never serialized back to clients, so the body usually
/// omits it; the store then keeps the stored one.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(mut request): Json<User>,
) -> impl IntoResponse {
    info!("PUT /api/users/{}", user_id);
    request.id = user_id;

    match state.store.update_user(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("update user", e),
    }
}

/// Delete a user and everything they own
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/users/{}", user_id);

    match state.store.delete_user(user_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response("delete user", e),
    }
}

/// What the presentation layer may offer this user
pub async fn get_user_capabilities(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/users/{}/capabilities", user_id);

    match state.store.get_user(user_id).await {
        Ok(user) => (StatusCode::OK, Json(capabilities_for(user.role))).into_response(),
        Err(e) => error_response("get user capabilities", e),
    }
}

/// Phone/password login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/login - phone={}", request.phone);

    match state.store.authenticate(&request.phone, &request.password).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => {
            warn!("Rejected login for phone {}", request.phone);
            (StatusCode::UNAUTHORIZED, "Invalid phone or password").into_response()
        }
        Err(e) => error_response("log in", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{parse, router_for, send};
    use crate::backend::test_utils::{new_club, TestEnvironment};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use shared::{Capability, CreatedResponse, ErrorResponse, User, UserRole};
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_register_and_login() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);

        let body = json!({
            "role": "PARENT",
            "full_name": "Иванова Мария",
            "phone": "89101111111",
            "password": "secret"
        });
        let (status, bytes) = send(&router, Method::POST, "/api/users", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: CreatedResponse = parse(&bytes);

        let (status, bytes) = send(&router, Method::POST, "/api/users", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorResponse = parse(&bytes);
        assert_eq!(error.error, "duplicate");

        let login = json!({ "phone": "89101111111", "password": "secret" });
        let (status, bytes) = send(&router, Method::POST, "/api/auth/login", Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        let user: User = parse(&bytes);
        assert_eq!(user.id, created.id);
        assert!(user.password.is_empty(), "password must not be serialized");

        let wrong = json!({ "phone": "89101111111", "password": "nope" });
        let (status, _) = send(&router, Method::POST, "/api/auth/login", Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_omitted() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let id = env.parent().await;
        let stored = env.store.get_user(id).await.unwrap();

        let body = json!({
            "id": 0,
            "role": "PARENT",
            "full_name": "Новое имя",
            "phone": stored.phone,
            "city": "Муром",
            "registered_at": stored.registered_at,
        });
        let (status, _) = send(&router, Method::PUT, &format!("/api/users/{id}"), Some(body)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let updated = env.store.get_user(id).await.unwrap();
        assert_eq!(updated.full_name, "Новое имя");
        assert_eq!(updated.city.as_deref(), Some("Муром"));
        assert_eq!(updated.password, stored.password);
    }

    #[tokio::test]
    async fn test_demoting_club_owner_is_bad_request() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let organizer = env.organizer().await;
        env.store.create_club(new_club(organizer, "Робототехника")).await.unwrap();
        let stored = env.store.get_user(organizer).await.unwrap();

        let body = json!({
            "id": organizer,
            "role": "PARENT",
            "full_name": stored.full_name,
            "phone": stored.phone,
            "registered_at": stored.registered_at,
        });
        let (status, bytes) = send(&router, Method::PUT, &format!("/api/users/{organizer}"), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = parse(&bytes);
        assert_eq!(error.error, "validation");
        assert_eq!(env.store.get_user(organizer).await.unwrap().role, UserRole::Organizer);
    }

    #[tokio::test]
    async fn test_capabilities_and_missing_user() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let organizer = env.organizer().await;

        let (status, bytes) = send(&router, Method::GET, &format!("/api/users/{organizer}/capabilities"), None).await;
        assert_eq!(status, StatusCode::OK);
        let capabilities: BTreeSet<Capability> = parse(&bytes);
        assert!(capabilities.contains(&Capability::ManageOwnClubs));
        assert!(!capabilities.contains(&Capability::VerifyClubs));

        let (status, bytes) = send(&router, Method::GET, "/api/users/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorResponse = parse(&bytes);
        assert_eq!(error.error, "not_found");

        let (status, _) = send(&router, Method::DELETE, "/api/users/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
