//! # Domain Module
//!
//! Business rules of the club directory, built on top of the storage layer.
//!
//! ## Module Organization
//!
//! - **store**: the [`ClubStore`] handle and the single-writer execution of mutations
//! - **integrity**: field validation, foreign key checks and cascade deletes
//! - **rating**: the derived club rating and review count
//! - **search**: structured and free-text club search
//! - **application_workflow**: the enrollment application state machine
//! - **favorites**: the deduplicated user/club favorite relation
//! - **live_query**: subscriptions re-evaluated after each relevant commit
//! - **seed**: the one-time demo dataset
//! - **user_service**, **club_service**, **child_service**, **review_service**:
//!   commands and queries per entity
//!
//! ## Business Rules
//!
//! - A mutation either commits completely or leaves the store untouched
//! - Mutations never interleave; reads only see committed state
//! - Club ratings are never written by clients
//! - Only organizers and admins own clubs
//! - Applications leave `Pending` once and never move again

pub mod application_workflow;
pub mod child_service;
pub mod club_service;
pub mod error;
pub mod favorites;
pub mod integrity;
pub mod live_query;
pub mod rating;
pub mod review_service;
pub mod search;
pub mod seed;
pub mod store;
pub mod user_service;

pub use application_workflow::check_transition;
pub use error::{StoreError, StoreResult};
pub use integrity::CascadeReport;
pub use live_query::{ChangeSet, QueryShape, Snapshot, Subscription, Table};
pub use rating::round_rating;
pub use search::DEFAULT_TOP_CLUBS;
pub use store::ClubStore;
