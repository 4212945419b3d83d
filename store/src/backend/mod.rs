//! # Backend Module
//!
//! Contains all non-UI logic for the club directory.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Domain**: integrity rules, rating aggregation, search, the application
//!   workflow, favorites and live queries
//! - **Storage**: the SQLite schema and per-table repositories
//! - **IO**: the REST interface exposed to presentation layers
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! ```text
//! Presentation (mobile/web client)
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (ClubStore, business rules)
//!     ↓
//! Storage Layer (SQLite, repositories)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Initialize and configure the application state
//! - Set up the REST API router with proper CORS configuration

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::backend::config::StoreConfig;
use crate::backend::domain::ClubStore;

/// Main application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: ClubStore,
}

/// Open the store and build the application state
pub async fn initialize_backend(config: &StoreConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let store = ClubStore::open(config)
        .await
        .context("Failed to open club directory store")?;

    info!("Setting up application state");
    Ok(AppState { store })
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: &str) -> Result<Router> {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {allowed_origin}"))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        // users
        .route("/users", get(io::list_users).post(io::create_user))
        .route("/users/by-phone/:phone", get(io::get_user_by_phone))
        .route(
            "/users/:id",
            get(io::get_user).put(io::update_user).delete(io::delete_user),
        )
        .route("/users/:id/capabilities", get(io::get_user_capabilities))
        .route("/users/:id/children", get(io::list_children))
        .route("/users/:id/applications", get(io::get_user_applications))
        .route("/users/:id/favorites", get(io::get_favorite_clubs))
        .route("/users/:id/favorites/:club_id", get(io::get_favorite_state))
        .route("/auth/login", post(io::login))
        // clubs
        .route("/clubs", get(io::list_active_clubs).post(io::create_club))
        .route("/clubs/top", get(io::get_top_clubs))
        .route("/clubs/search", get(io::search_clubs))
        .route("/clubs/search/text", get(io::search_clubs_by_text))
        .route(
            "/clubs/:id",
            get(io::get_club).put(io::update_club).delete(io::delete_club),
        )
        .route("/clubs/:id/verified", put(io::set_club_verified))
        .route("/clubs/:id/reviews", get(io::get_club_reviews))
        .route("/clubs/:id/applications", get(io::get_club_applications))
        .route("/organizers/:id/clubs", get(io::get_organizer_clubs))
        .route("/organizers/:id/applications", get(io::get_organizer_applications))
        // children
        .route("/children", post(io::create_child))
        .route(
            "/children/:id",
            get(io::get_child).put(io::update_child).delete(io::delete_child),
        )
        // reviews
        .route("/reviews", get(io::list_reviews).post(io::create_review))
        .route("/reviews/:id", get(io::get_review).delete(io::delete_review))
        .route("/reviews/:id/reply", put(io::set_review_reply))
        .route("/reviews/:id/approved", put(io::set_review_approved))
        // applications
        .route("/applications", post(io::create_application))
        .route("/applications/:id", get(io::get_application))
        .route("/applications/:id/status", put(io::set_application_status))
        // favorites
        .route("/favorites/toggle", post(io::toggle_favorite));

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state))
}
