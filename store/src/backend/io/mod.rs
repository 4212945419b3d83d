//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: one handler per store command or query
//! - **Data Serialization**: JSON in and out via serde
//! - **Error Translation**: store errors to HTTP status codes with a JSON body
//!
//! ## Design Patterns
//!
//! - **Handler Pattern**: separate handler functions for each endpoint
//! - **Dependency Injection**: the store handle injected via Axum state

pub mod rest;

pub use rest::*;
