//! # REST API for Club Management
//!
//! Endpoints for the club directory:
//! - CRUD on clubs (ratings are always derived, never accepted from clients)
//! - Verification by administrators
//! - Structured search, free-text search and the top-rated list

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use shared::{Club, ClubFilter, CreatedResponse, NewClub, SetVerifiedRequest};
use tracing::info;

use super::error_response;
use crate::backend::domain::DEFAULT_TOP_CLUBS;
use crate::backend::AppState;

#[derive(Debug, Deserialize)]
pub struct TopClubsQuery {
    pub n: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TextSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Create a new club, unverified and unrated
pub async fn create_club(
    State(state): State<AppState>,
    Json(request): Json<NewClub>,
) -> impl IntoResponse {
    info!("POST /api/clubs - request: {:?}", request);

    match state.store.create_club(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => error_response("create club", e),
    }
}

/// List active clubs, best rated first
pub async fn list_active_clubs(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/clubs");

    match state.store.get_all_active_clubs().await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("list clubs", e),
    }
}

pub async fn get_club(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/clubs/{}", club_id);

    match state.store.get_club(club_id).await {
        Ok(club) => (StatusCode::OK, Json(club)).into_response(),
        Err(e) => error_response("get club", e),
    }
}

pub async fn update_club(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
    Json(mut request): Json<Club>,
) -> impl IntoResponse {
    info!("PUT /api/clubs/{} - name={}", club_id, request.name);
    request.id = club_id;

    match state.store.update_club(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("update club", e),
    }
}

/// Delete a club with its reviews, applications and favorites
pub async fn delete_club(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/clubs/{}", club_id);

    match state.store.delete_club(club_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response("delete club", e),
    }
}

pub async fn set_club_verified(
    State(state): State<AppState>,
    Path(club_id): Path<i64>,
    Json(request): Json<SetVerifiedRequest>,
) -> impl IntoResponse {
    info!("PUT /api/clubs/{}/verified - verified={}", club_id, request.verified);

    match state.store.set_club_verified(club_id, request.verified).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("set club verification", e),
    }
}

pub async fn get_organizer_clubs(
    State(state): State<AppState>,
    Path(organizer_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/organizers/{}/clubs", organizer_id);

    match state.store.get_clubs_by_organizer(organizer_id).await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("list organizer clubs", e),
    }
}

/// Top rated active clubs, three unless `n` is given
pub async fn get_top_clubs(
    State(state): State<AppState>,
    Query(query): Query<TopClubsQuery>,
) -> impl IntoResponse {
    let n = query.n.unwrap_or(DEFAULT_TOP_CLUBS);
    info!("GET /api/clubs/top?n={}", n);

    match state.store.get_top_clubs(n).await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("get top clubs", e),
    }
}

/// Structured search over active clubs
pub async fn search_clubs(
    State(state): State<AppState>,
    Query(filter): Query<ClubFilter>,
) -> impl IntoResponse {
    info!("GET /api/clubs/search - filter: {:?}", filter);

    match state.store.search_clubs(&filter).await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("search clubs", e),
    }
}

/// Case-insensitive substring search over name and description
pub async fn search_clubs_by_text(
    State(state): State<AppState>,
    Query(query): Query<TextSearchQuery>,
) -> impl IntoResponse {
    info!("GET /api/clubs/search/text?q={}", query.q);

    match state.store.search_clubs_by_text(&query.q).await {
        Ok(clubs) => (StatusCode::OK, Json(clubs)).into_response(),
        Err(e) => error_response("search clubs by text", e),
    }
}
