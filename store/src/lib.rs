//! Local persistence and consistency layer for a children's club directory.
//!
//! [`ClubStore`] is the entry point: it owns the SQLite database and exposes
//! every command and query. [`create_router`] wraps a store in the REST API
//! served by the `club-directory` binary.

pub mod backend;

pub use backend::config::{ServerConfig, StoreConfig};
pub use backend::domain::{
    CascadeReport, ChangeSet, ClubStore, QueryShape, Snapshot, StoreError, StoreResult,
    Subscription, Table,
};
pub use backend::{create_router, initialize_backend, AppState};
