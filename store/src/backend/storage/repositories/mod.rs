//! Repositories for each persisted table.
//!
//! Every function takes an executor so the same query runs against the pool
//! (reads) or against the open transaction of a write unit (mutations).

pub mod application_repository;
pub mod child_repository;
pub mod club_repository;
pub mod favorite_repository;
pub mod meta_repository;
pub mod review_repository;
pub mod user_repository;

pub use application_repository::ApplicationRepository;
pub use child_repository::ChildRepository;
pub use club_repository::ClubRepository;
pub use favorite_repository::FavoriteRepository;
pub use meta_repository::MetaRepository;
pub use review_repository::ReviewRepository;
pub use user_repository::UserRepository;

use shared::UnknownVariant;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;

/// Read an enum column stored by its upper-case name
pub(crate) fn decode_enum<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
