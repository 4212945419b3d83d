//! # REST API for Favorites

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{FavoriteStateResponse, ToggleFavoriteRequest};
use tracing::info;

use super::error_response;
use crate::backend::AppState;

/// Flip a favorite and report the new state
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Json(request): Json<ToggleFavoriteRequest>,
) -> impl IntoResponse {
    info!("POST /api/favorites/toggle - user={}, club={}", request.user_id, request.club_id);

    match state.store.toggle_favorite(request.user_id, request.club_id).await {
        Ok(is_favorite) => {
            let response = FavoriteStateResponse {
                user_id: request.user_id,
                club_id: request.club_id,
                is_favorite,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response("toggle favorite", e),
    }
}

/// Favorite clubs of a user, most recently added first
pub async fn get_favorite_clubs(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/users/{}/favorites", user_id);

    match state.store.get_favorite_clubs(user_id).await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("list favorite clubs", e),
    }
}

pub async fn get_favorite_state(
    State(state): State<AppState>,
    Path((user_id, club_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    info!("GET /api/users/{}/favorites/{}", user_id, club_id);

    match state.store.is_favorite(user_id, club_id).await {
        Ok(is_favorite) => {
            let response = FavoriteStateResponse { user_id, club_id, is_favorite };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response("get favorite state", e),
    }
}
