//! Types shared between the club directory store and its consumers.
//!
//! Everything in here is plain data: entities as they are persisted, the write
//! DTOs used to create them, the club search filter and the role capability
//! lookup used by presentation layers to decide what a user may see.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Returned when a stored enum name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! stored_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $stored:literal),+ $(,)? }) => {
        impl $name {
            /// Name used in storage and on the wire
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $stored),+
                }
            }

            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($stored => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Account type of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Parent,
    Child,
    Organizer,
    Admin,
}

stored_enum!(UserRole, "user role", {
    Parent => "PARENT",
    Child => "CHILD",
    Organizer => "ORGANIZER",
    Admin => "ADMIN",
});

impl UserRole {
    /// Only organizers and administrators may own a club
    pub const fn can_own_clubs(self) -> bool {
        matches!(self, UserRole::Organizer | UserRole::Admin)
    }
}

/// Activity direction of a club
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClubCategory {
    Sport,
    Art,
    Science,
    Music,
    Dance,
    Language,
    It,
    Other,
}

stored_enum!(ClubCategory, "club category", {
    Sport => "SPORT",
    Art => "ART",
    Science => "SCIENCE",
    Music => "MUSIC",
    Dance => "DANCE",
    Language => "LANGUAGE",
    It => "IT",
    Other => "OTHER",
});

impl ClubCategory {
    /// Human-readable title shown in the directory
    pub const fn title(self) -> &'static str {
        match self {
            ClubCategory::Sport => "Спорт",
            ClubCategory::Art => "Творчество",
            ClubCategory::Science => "Наука",
            ClubCategory::Music => "Музыка",
            ClubCategory::Dance => "Танцы",
            ClubCategory::Language => "Языки",
            ClubCategory::It => "IT и программирование",
            ClubCategory::Other => "Другое",
        }
    }
}

/// Lifecycle state of an enrollment application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

stored_enum!(ApplicationStatus, "application status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Cancelled => "CANCELLED",
});

impl ApplicationStatus {
    /// Terminal states never change again
    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub role: UserRole,
    pub full_name: String,
    /// Login identifier, unique across all users
    pub phone: String,
    /// Opaque credential, compared verbatim on login
    #[serde(skip_serializing, default)]
    pub password: String,
    pub city: Option<String>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub role: UserRole,
    pub full_name: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Directory listing for a recurring activity.
///
/// `rating` and `review_count` are derived from approved reviews and are
/// ignored on every client write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub id: i64,
    pub organizer_id: i64,
    pub name: String,
    pub description: String,
    pub category: ClubCategory,
    pub city: String,
    pub district: Option<String>,
    pub address: String,
    pub age_from: i32,
    pub age_to: i32,
    /// Monthly fee, 0 means free
    pub price_per_month: i64,
    pub schedule: String,
    pub image_ref: Option<String>,
    pub verified: bool,
    pub active: bool,
    pub rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Club {
    pub fn accepts_age(&self, age: i32) -> bool {
        self.age_from <= age && age <= self.age_to
    }

    pub fn is_free(&self) -> bool {
        self.price_per_month == 0
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClub {
    pub organizer_id: i64,
    pub name: String,
    pub description: String,
    pub category: ClubCategory,
    pub city: String,
    #[serde(default)]
    pub district: Option<String>,
    pub address: String,
    pub age_from: i32,
    pub age_to: i32,
    pub price_per_month: i64,
    pub schedule: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Child registered by a parent account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    /// Snapshot taken by the writer, never recomputed by the store
    pub age: i32,
    pub interests: Option<String>,
    pub health_info: Option<String>,
    pub additional_info: Option<String>,
}

impl ChildProfile {
    /// Full years between `birth_date` and `today`, used by writers to fill `age`.
    pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
        let mut years = today.year() - birth_date.year();
        if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
            years -= 1;
        }
        years.max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChildProfile {
    pub parent_id: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub health_info: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub club_id: i64,
    pub user_id: i64,
    /// 1..=5
    pub rating: i32,
    pub text: String,
    pub reply: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub club_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub text: String,
    #[serde(default = "default_true")]
    pub approved: bool,
}

/// Enrollment request, optionally filed on behalf of a child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub club_id: i64,
    pub user_id: i64,
    pub child_id: Option<i64>,
    pub status: ApplicationStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub club_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub child_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub club_id: i64,
    pub added_at: DateTime<Utc>,
}

/// Structured club search.
///
/// An empty `city` and `None` everywhere else matches every active club.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClubFilter {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub category: Option<ClubCategory>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub max_price: Option<i64>,
}

impl ClubFilter {
    pub fn is_empty(&self) -> bool {
        self.city.trim().is_empty()
            && self.category.is_none()
            && self.age.is_none()
            && self.max_price.is_none()
    }
}

/// Action a presentation layer may offer to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    BrowseClubs,
    ViewProfile,
    SubmitApplications,
    ManageFavorites,
    WriteReviews,
    ManageChildren,
    ManageOwnClubs,
    ReviewApplications,
    ReplyToReviews,
    ManageUsers,
    ManageAllClubs,
    VerifyClubs,
    ModerateReviews,
}

/// What a role is allowed to do.
///
/// This only drives what the presentation layer offers; the store still
/// enforces ownership rules on its own.
pub fn capabilities_for(role: UserRole) -> BTreeSet<Capability> {
    use Capability::*;

    let specific: &[Capability] = match role {
        UserRole::Parent => &[SubmitApplications, ManageFavorites, WriteReviews, ManageChildren],
        UserRole::Child => &[SubmitApplications, ManageFavorites, WriteReviews],
        UserRole::Organizer => &[ManageOwnClubs, ReviewApplications, ReplyToReviews],
        UserRole::Admin => &[ManageUsers, ManageAllClubs, VerifyClubs, ModerateReviews],
    };

    [BrowseClubs, ViewProfile]
        .into_iter()
        .chain(specific.iter().copied())
        .collect()
}

// Request/response bodies used by the HTTP adapter

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVerifiedRequest {
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetReplyRequest {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetApprovedRequest {
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleFavoriteRequest {
    pub user_id: i64,
    pub club_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteStateResponse {
    pub user_id: i64,
    pub club_id: i64,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
