//! # REST API for Reviews
//!
//! Every write here moves the owning club's rating, which the store
//! recomputes in the same transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{CreatedResponse, NewReview, SetApprovedRequest, SetReplyRequest};
use tracing::info;

use super::error_response;
use crate::backend::AppState;

pub async fn create_review(
    State(state): State<AppState>,
    Json(request): Json<NewReview>,
) -> impl IntoResponse {
    info!(
        "POST /api/reviews - club={}, user={}, rating={}",
        request.club_id, request.user_id, request.rating
    );

    match state.store.create_review(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => error_response("create review", e),
    }
}

/// Approved reviews of one club, newest first
pub async fn get_club_reviews(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/clubs/{}/reviews", club_id);

    match state.store.get_reviews_for_club(club_id).await {
        Ok(reviews) => (StatusCode::OK, Json(reviews)).into_response(),
        Err(e) => error_response("list club reviews", e),
    }
}

/// Every review including unapproved ones, for moderation
pub async fn list_reviews(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/reviews");

    match state.store.get_all_reviews().await {
        Ok(reviews) => (StatusCode::OK, Json(reviews)).into_response(),
        Err(e) => error_response("list reviews", e),
    }
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/reviews/{}", review_id);

    match state.store.get_review(review_id).await {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(e) => error_response("get review", e),
    }
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/reviews/{}", review_id);

    match state.store.delete_review(review_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete review", e),
    }
}

/// Attach the organizer's reply
pub async fn set_review_reply(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Json(request): Json<SetReplyRequest>,
) -> impl IntoResponse {
    info!("PUT /api/reviews/{}/reply", review_id);

    match state.store.set_review_reply(review_id, request.reply).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("set review reply", e),
    }
}

/// Moderation toggle
pub async fn set_review_approved(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Json(request): Json<SetApprovedRequest>,
) -> impl IntoResponse {
    info!("PUT /api/reviews/{}/approved - approved={}", review_id, request.approved);

    match state.store.set_review_approved(review_id, request.approved).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("set review approval", e),
    }
}
