//! Test utilities shared by the unit tests of every layer.
//!
//! Each [`TestEnvironment`] owns a fresh on-disk SQLite database inside a
//! temporary directory that is removed when the environment is dropped, even
//! if the test panics.

use shared::{ClubCategory, NewClub, NewReview, NewUser, UserRole};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

use crate::backend::config::StoreConfig;
use crate::backend::domain::ClubStore;

/// RAII test environment with its own database
pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub store: ClubStore,
    pub database_path: PathBuf,
    next_phone: AtomicU64,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let database_path = temp_dir.path().join("clubs.db");
        let store = ClubStore::open(&StoreConfig::for_path(&database_path))
            .await
            .expect("Failed to open test store");

        Self {
            _temp_dir: temp_dir,
            store,
            database_path,
            next_phone: AtomicU64::new(89_100_000_000),
        }
    }

    /// Register a user with a fresh phone number and return its id
    pub async fn user_with_role(&self, role: UserRole) -> i64 {
        let phone = self.next_phone.fetch_add(1, Ordering::Relaxed).to_string();
        self.store
            .create_user(new_user(role, &phone))
            .await
            .expect("Failed to create test user")
    }

    pub async fn organizer(&self) -> i64 {
        self.user_with_role(UserRole::Organizer).await
    }

    pub async fn parent(&self) -> i64 {
        self.user_with_role(UserRole::Parent).await
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if std::env::var("CLUB_DIRECTORY_DEBUG_TESTS").is_ok() {
            println!("Cleaning up test database: {:?}", self.database_path);
        }
    }
}

pub fn new_user(role: UserRole, phone: &str) -> NewUser {
    NewUser {
        role,
        full_name: format!("Test {role} {phone}"),
        phone: phone.to_string(),
        password: "123456".to_string(),
        city: None,
    }
}

/// An active sport club in Муром for ages 7 to 16 at 2000 per month
pub fn new_club(organizer_id: i64, name: &str) -> NewClub {
    NewClub {
        organizer_id,
        name: name.to_string(),
        description: format!("{name}: занятия для детей"),
        category: ClubCategory::Sport,
        city: "Муром".to_string(),
        district: None,
        address: "ул. Ленина, 15".to_string(),
        age_from: 7,
        age_to: 16,
        price_per_month: 2000,
        schedule: "Пн, Ср 16:00-18:00".to_string(),
        image_ref: None,
        active: true,
    }
}

pub fn new_review(club_id: i64, user_id: i64, rating: i32) -> NewReview {
    NewReview {
        club_id,
        user_id,
        rating,
        text: format!("Оценка {rating}"),
        approved: true,
    }
}
