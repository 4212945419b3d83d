//! # REST API for Child Management
//!
//! Endpoints for creating, retrieving, updating, and deleting child profiles.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{ChildProfile, CreatedResponse, NewChildProfile};
use tracing::info;

use super::error_response;
use crate::backend::AppState;

/// Create a new child profile
pub async fn create_child(
    State(state): State<AppState>,
    Json(request): Json<NewChildProfile>,
) -> impl IntoResponse {
    info!("POST /api/children - request: {:?}", request);

    match state.store.create_child(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => error_response("create child", e),
    }
}

/// Get a child by ID
pub async fn get_child(
    State(state): State<AppState>,
    Path(child_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/children/{}", child_id);

    match state.store.get_child(child_id).await {
        Ok(child) => (StatusCode::OK, Json(child)).into_response(),
        Err(e) => error_response("get child", e),
    }
}

/// List the children of one parent
pub async fn list_children(
    State(state): State<AppState>,
    Path(parent_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/users/{}/children", parent_id);

    match state.store.get_children_for_parent(parent_id).await {
        Ok(children) => (StatusCode::OK, Json(children)).into_response(),
        Err(e) => error_response("list children", e),
    }
}

/// Update a child
pub async fn update_child(
    State(state): State<AppState>,
    Path(child_id): Path<i64>,
    Json(mut request): Json<ChildProfile>,
) -> impl IntoResponse {
    info!("PUT /api/children/{} - request: {:?}", child_id, request);
    request.id = child_id;

    match state.store.update_child(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("update child", e),
    }
}

/// Delete a child; applications filed for it stay, detached
pub async fn delete_child(
    State(state): State<AppState>,
    Path(child_id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/children/{}", child_id);

    match state.store.delete_child(child_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete child", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{parse, router_for, send};
    use crate::backend::test_utils::TestEnvironment;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use shared::{ChildProfile, CreatedResponse};

    #[tokio::test]
    async fn test_child_lifecycle() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);
        let parent = env.parent().await;

        let body = json!({
            "parent_id": parent,
            "name": "Петя",
            "birth_date": "2016-05-20",
            "age": 9,
            "interests": "шахматы"
        });
        let (status, bytes) = send(&router, Method::POST, "/api/children", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: CreatedResponse = parse(&bytes);

        let (_, bytes) = send(&router, Method::GET, &format!("/api/users/{parent}/children"), None).await;
        let children: Vec<ChildProfile> = parse(&bytes);
        assert_eq!(children.len(), 1);

        let mut child = children[0].clone();
        child.name = "Пётр".to_string();
        let body = serde_json::to_value(&child).unwrap();
        let (status, _) = send(&router, Method::PUT, &format!("/api/children/{}", created.id), Some(body)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, bytes) = send(&router, Method::GET, &format!("/api/children/{}", created.id), None).await;
        let stored: ChildProfile = parse(&bytes);
        assert_eq!(stored.name, "Пётр");

        let (status, _) = send(&router, Method::DELETE, &format!("/api/children/{}", created.id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, Method::DELETE, &format!("/api/children/{}", created.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_child_for_unknown_parent() {
        let env = TestEnvironment::new().await;
        let router = router_for(&env);

        let body = json!({ "parent_id": 4242, "name": "Оля", "birth_date": "2018-01-01", "age": 7 });
        let (status, _) = send(&router, Method::POST, "/api/children", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
