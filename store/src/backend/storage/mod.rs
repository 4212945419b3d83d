//! # Storage Module
//!
//! Handles persistence for the club directory.
//!
//! ## Key Responsibilities
//!
//! - **Connection Management**: opening the SQLite pool with foreign keys and WAL enabled
//! - **Schema Versioning**: recreating the tables when the stored version does not match
//! - **Data Access**: one repository per table, usable against the pool or a transaction
//!
//! Repositories never enforce cross-table rules. Validation, cascades and the
//! rating aggregate live in the domain layer, which drives repositories from a
//! single write transaction at a time.

pub mod connection;
pub mod repositories;

pub use connection::{DbConnection, CURRENT_SCHEMA_VERSION};
pub use repositories::{
    ApplicationRepository, ChildRepository, ClubRepository, FavoriteRepository, MetaRepository,
    ReviewRepository, UserRepository,
};
