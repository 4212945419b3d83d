//! Field validation, foreign key checks and cascade deletes.
//!
//! Checks run against the open write unit before any row is written, so a
//! rejected mutation commits nothing. Cascades are explicit here rather than
//! left to `ON DELETE CASCADE` because every removed review has to flow
//! through the rating aggregate of its club.

use shared::{
    ChildProfile, Club, NewApplication, NewChildProfile, NewClub, NewReview, NewUser, User,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::live_query::Table;
use super::rating;
use super::store::WriteUnit;
use crate::backend::storage::{
    ApplicationRepository, ChildRepository, ClubRepository, FavoriteRepository, ReviewRepository,
    UserRepository,
};

fn require_text(field: &'static str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

async fn referenced_user(unit: &mut WriteUnit, id: i64) -> StoreResult<User> {
    UserRepository::find_by_id(unit.conn(), id)
        .await?
        .ok_or(StoreError::Referential { entity: "user", id })
}

async fn referenced_club(unit: &mut WriteUnit, id: i64) -> StoreResult<Club> {
    ClubRepository::find_by_id(unit.conn(), id)
        .await?
        .ok_or(StoreError::Referential { entity: "club", id })
}

async fn referenced_child(unit: &mut WriteUnit, id: i64) -> StoreResult<ChildProfile> {
    ChildRepository::find_by_id(unit.conn(), id)
        .await?
        .ok_or(StoreError::Referential { entity: "child", id })
}

/// Reject a phone that belongs to a user other than `owner`
async fn ensure_phone_free(unit: &mut WriteUnit, phone: &str, owner: Option<i64>) -> StoreResult<()> {
    match UserRepository::find_by_phone(unit.conn(), phone).await? {
        Some(existing) if Some(existing.id) != owner => Err(StoreError::Duplicate {
            field: "phone",
            value: phone.to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) async fn check_new_user(unit: &mut WriteUnit, user: &NewUser) -> StoreResult<()> {
    require_text("full_name", &user.full_name)?;
    require_text("phone", &user.phone)?;
    ensure_phone_free(unit, &user.phone, None).await
}

pub(crate) async fn check_user_update(unit: &mut WriteUnit, user: &User) -> StoreResult<()> {
    require_text("full_name", &user.full_name)?;
    require_text("phone", &user.phone)?;
    ensure_phone_free(unit, &user.phone, Some(user.id)).await?;

    if !user.role.can_own_clubs() {
        let owned = ClubRepository::ids_by_organizer(unit.conn(), user.id).await?;
        if !owned.is_empty() {
            return Err(StoreError::validation(
                "role",
                format!("{} still organizes {} club(s)", user.role, owned.len()),
            ));
        }
    }
    Ok(())
}

struct ClubFields<'a> {
    organizer_id: i64,
    name: &'a str,
    city: &'a str,
    address: &'a str,
    age_from: i32,
    age_to: i32,
    price_per_month: i64,
}

impl<'a> From<&'a NewClub> for ClubFields<'a> {
    fn from(club: &'a NewClub) -> Self {
        Self {
            organizer_id: club.organizer_id,
            name: &club.name,
            city: &club.city,
            address: &club.address,
            age_from: club.age_from,
            age_to: club.age_to,
            price_per_month: club.price_per_month,
        }
    }
}

impl<'a> From<&'a Club> for ClubFields<'a> {
    fn from(club: &'a Club) -> Self {
        Self {
            organizer_id: club.organizer_id,
            name: &club.name,
            city: &club.city,
            address: &club.address,
            age_from: club.age_from,
            age_to: club.age_to,
            price_per_month: club.price_per_month,
        }
    }
}

async fn check_club_fields(unit: &mut WriteUnit, club: ClubFields<'_>) -> StoreResult<()> {
    require_text("name", club.name)?;
    require_text("city", club.city)?;
    require_text("address", club.address)?;

    if club.age_from < 0 {
        return Err(StoreError::validation("age_from", "must not be negative"));
    }
    if club.age_to < 0 {
        return Err(StoreError::validation("age_to", "must not be negative"));
    }
    if club.age_from > club.age_to {
        return Err(StoreError::validation(
            "age_to",
            format!("{} is below age_from {}", club.age_to, club.age_from),
        ));
    }
    if club.price_per_month < 0 {
        return Err(StoreError::validation("price_per_month", "must not be negative"));
    }

    let organizer = referenced_user(unit, club.organizer_id).await?;
    if !organizer.role.can_own_clubs() {
        return Err(StoreError::validation(
            "organizer_id",
            format!("user {} with role {} cannot own clubs", organizer.id, organizer.role),
        ));
    }
    Ok(())
}

pub(crate) async fn check_new_club(unit: &mut WriteUnit, club: &NewClub) -> StoreResult<()> {
    check_club_fields(unit, club.into()).await
}

pub(crate) async fn check_club_update(unit: &mut WriteUnit, club: &Club) -> StoreResult<()> {
    check_club_fields(unit, club.into()).await
}

async fn check_child_fields(unit: &mut WriteUnit, parent_id: i64, name: &str, age: i32) -> StoreResult<()> {
    require_text("name", name)?;
    if age < 0 {
        return Err(StoreError::validation("age", "must not be negative"));
    }
    referenced_user(unit, parent_id).await?;
    Ok(())
}

pub(crate) async fn check_new_child(unit: &mut WriteUnit, child: &NewChildProfile) -> StoreResult<()> {
    check_child_fields(unit, child.parent_id, &child.name, child.age).await
}

pub(crate) async fn check_child_update(unit: &mut WriteUnit, child: &ChildProfile) -> StoreResult<()> {
    check_child_fields(unit, child.parent_id, &child.name, child.age).await
}

pub(crate) async fn check_new_review(unit: &mut WriteUnit, review: &NewReview) -> StoreResult<()> {
    if !(1..=5).contains(&review.rating) {
        return Err(StoreError::validation(
            "rating",
            format!("{} is outside 1..=5", review.rating),
        ));
    }
    require_text("text", &review.text)?;
    referenced_club(unit, review.club_id).await?;
    referenced_user(unit, review.user_id).await?;
    Ok(())
}

pub(crate) async fn check_new_application(unit: &mut WriteUnit, application: &NewApplication) -> StoreResult<()> {
    referenced_club(unit, application.club_id).await?;
    referenced_user(unit, application.user_id).await?;

    if let Some(child_id) = application.child_id {
        let child = referenced_child(unit, child_id).await?;
        if child.parent_id != application.user_id {
            return Err(StoreError::validation(
                "child_id",
                format!("child {} does not belong to user {}", child_id, application.user_id),
            ));
        }
    }
    Ok(())
}

/// Rows removed by a cascade
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub clubs: u64,
    pub applications: u64,
    pub reviews: u64,
    pub favorites: u64,
    pub children: u64,
}

impl CascadeReport {
    fn absorb(&mut self, other: CascadeReport) {
        self.clubs += other.clubs;
        self.applications += other.applications;
        self.reviews += other.reviews;
        self.favorites += other.favorites;
        self.children += other.children;
    }
}

/// Delete a club with its applications, reviews and favorites.
///
/// Returns `None` when the club does not exist.
pub(crate) async fn cascade_delete_club(unit: &mut WriteUnit, club_id: i64) -> StoreResult<Option<CascadeReport>> {
    let report = CascadeReport {
        applications: ApplicationRepository::delete_by_club(unit.conn(), club_id).await?,
        reviews: ReviewRepository::delete_by_club(unit.conn(), club_id).await?,
        favorites: FavoriteRepository::delete_by_club(unit.conn(), club_id).await?,
        ..CascadeReport::default()
    };

    if !ClubRepository::delete(unit.conn(), club_id).await? {
        return Ok(None);
    }

    unit.touch(Table::Clubs);
    unit.touch(Table::Applications);
    unit.touch(Table::Reviews);
    unit.touch(Table::Favorites);

    info!(
        "Deleted club {} with {} applications, {} reviews, {} favorites",
        club_id, report.applications, report.reviews, report.favorites
    );
    Ok(Some(CascadeReport { clubs: 1, ..report }))
}

/// Delete a user and everything that depends on them.
///
/// Clubs the user organizes go with their own cascades. Clubs that survive
/// but lose reviews written by the user get their rating recomputed.
/// Returns `None` when the user does not exist.
pub(crate) async fn cascade_delete_user(unit: &mut WriteUnit, user_id: i64) -> StoreResult<Option<CascadeReport>> {
    if UserRepository::find_by_id(unit.conn(), user_id).await?.is_none() {
        return Ok(None);
    }

    let mut report = CascadeReport::default();

    let owned_clubs = ClubRepository::ids_by_organizer(unit.conn(), user_id).await?;
    for club_id in &owned_clubs {
        if let Some(club_report) = cascade_delete_club(unit, *club_id).await? {
            report.absorb(club_report);
        }
    }

    let reviewed: BTreeSet<i64> = ReviewRepository::club_ids_by_author(unit.conn(), user_id)
        .await?
        .into_iter()
        .collect();

    report.applications += ApplicationRepository::delete_by_user(unit.conn(), user_id).await?;
    report.reviews += ReviewRepository::delete_by_author(unit.conn(), user_id).await?;
    report.favorites += FavoriteRepository::delete_by_user(unit.conn(), user_id).await?;
    report.children += ChildRepository::delete_by_parent(unit.conn(), user_id).await?;
    UserRepository::delete(unit.conn(), user_id).await?;

    for table in [
        Table::Users,
        Table::Applications,
        Table::Reviews,
        Table::Favorites,
        Table::Children,
    ] {
        unit.touch(table);
    }

    // owned clubs are gone already; recompute only the survivors
    rating::recompute_all(unit, reviewed.into_iter().filter(|id| !owned_clubs.contains(id))).await?;

    info!(
        "Deleted user {}: {} clubs, {} applications, {} reviews, {} favorites, {} children",
        user_id, report.clubs, report.applications, report.reviews, report.favorites, report.children
    );
    Ok(Some(report))
}

/// Delete a child profile, keeping applications filed for it with the child detached.
///
/// Returns false when the child does not exist.
pub(crate) async fn delete_child(unit: &mut WriteUnit, child_id: i64) -> StoreResult<bool> {
    let detached = ApplicationRepository::clear_child(unit.conn(), child_id).await?;
    if !ChildRepository::delete(unit.conn(), child_id).await? {
        return Ok(false);
    }

    unit.touch(Table::Children);
    if detached > 0 {
        unit.touch(Table::Applications);
    }
    info!("Deleted child {}, detached from {} applications", child_id, detached);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_utils::{new_club, new_review, TestEnvironment};
    use chrono::NaiveDate;
    use shared::UserRole;

    #[tokio::test]
    async fn test_club_field_invariants() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;

        let mut reversed = new_club(organizer, "Плавание");
        reversed.age_from = 12;
        reversed.age_to = 6;
        let err = env.store.create_club(reversed).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "age_to", .. }));

        let mut negative = new_club(organizer, "Плавание");
        negative.price_per_month = -1;
        let err = env.store.create_club(negative).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "price_per_month", .. }));

        let mut negative_age = new_club(organizer, "Плавание");
        negative_age.age_from = -1;
        let err = env.store.create_club(negative_age).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "age_from", .. }));

        let mut free = new_club(organizer, "Бесплатный");
        free.price_per_month = 0;
        free.age_from = 7;
        free.age_to = 7;
        assert!(env.store.create_club(free).await.is_ok());

        assert_eq!(env.store.get_all_active_clubs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_club_owner_must_exist_and_be_allowed() {
        let env = TestEnvironment::new().await;
        let parent = env.parent().await;

        let err = env.store.create_club(new_club(999, "Нет владельца")).await.unwrap_err();
        assert!(matches!(err, StoreError::Referential { entity: "user", id: 999 }));

        let err = env.store.create_club(new_club(parent, "Родительский")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "organizer_id", .. }));

        let admin = env.user_with_role(UserRole::Admin).await;
        assert!(env.store.create_club(new_club(admin, "Админский")).await.is_ok());
    }

    #[tokio::test]
    async fn test_review_bounds_and_references() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Вокал")).await.unwrap();

        for rating in [0, 6] {
            let err = env.store.create_review(new_review(club, parent, rating)).await.unwrap_err();
            assert!(matches!(err, StoreError::Validation { field: "rating", .. }));
        }

        let mut blank = new_review(club, parent, 4);
        blank.text = "   ".to_string();
        let err = env.store.create_review(blank).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "text", .. }));

        let err = env.store.create_review(new_review(404, parent, 4)).await.unwrap_err();
        assert!(matches!(err, StoreError::Referential { entity: "club", .. }));

        let err = env.store.create_review(new_review(club, 404, 4)).await.unwrap_err();
        assert!(matches!(err, StoreError::Referential { entity: "user", .. }));

        assert!(env.store.get_all_reviews().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_application_child_must_belong_to_applicant() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let other_parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Робототехника")).await.unwrap();

        let child = env
            .store
            .create_child(NewChildProfile {
                parent_id: other_parent,
                name: "Маша".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2016, 3, 1).unwrap(),
                age: 9,
                interests: None,
                health_info: None,
                additional_info: None,
            })
            .await
            .unwrap();

        let err = env
            .store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: Some(child),
                message: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "child_id", .. }));

        let err = env
            .store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: Some(777),
                message: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Referential { entity: "child", id: 777 }));

        assert!(env.store.get_applications_for_user(parent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_club_cascades() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Карате")).await.unwrap();
        let other = env.store.create_club(new_club(organizer, "Дзюдо")).await.unwrap();

        let review = env.store.create_review(new_review(club, parent, 5)).await.unwrap();
        env.store.create_review(new_review(other, parent, 4)).await.unwrap();
        let application = env
            .store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: None,
                message: Some("Хотим записаться".to_string()),
            })
            .await
            .unwrap();
        env.store.toggle_favorite(parent, club).await.unwrap();
        env.store.toggle_favorite(parent, other).await.unwrap();

        env.store.delete_club(club).await.unwrap();

        assert!(matches!(env.store.get_club(club).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(env.store.get_review(review).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(
            env.store.get_application(application).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(env.store.get_reviews_for_club(club).await.unwrap().is_empty());
        assert!(!env.store.is_favorite(parent, club).await.unwrap());

        // the other club is untouched
        assert_eq!(env.store.get_reviews_for_club(other).await.unwrap().len(), 1);
        assert!(env.store.is_favorite(parent, other).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_organizer_cascades_transitively() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Танцы")).await.unwrap();
        let review = env.store.create_review(new_review(club, parent, 5)).await.unwrap();
        let application = env
            .store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: None,
                message: None,
            })
            .await
            .unwrap();
        env.store.toggle_favorite(parent, club).await.unwrap();

        env.store.delete_user(organizer).await.unwrap();

        assert!(matches!(env.store.get_user(organizer).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(env.store.get_club(club).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(env.store.get_review(review).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(
            env.store.get_application(application).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(env.store.get_favorite_clubs(parent).await.unwrap().is_empty());

        // the parent account itself survives
        assert!(env.store.get_user(parent).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_parent_removes_owned_rows() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Лепка")).await.unwrap();
        let child = env
            .store
            .create_child(NewChildProfile {
                parent_id: parent,
                name: "Петя".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2017, 9, 1).unwrap(),
                age: 8,
                interests: Some("лепка".to_string()),
                health_info: None,
                additional_info: None,
            })
            .await
            .unwrap();
        env.store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: Some(child),
                message: None,
            })
            .await
            .unwrap();
        env.store.toggle_favorite(parent, club).await.unwrap();

        env.store.delete_user(parent).await.unwrap();

        assert!(matches!(env.store.get_child(child).await, Err(StoreError::NotFound { .. })));
        assert!(env.store.get_applications_for_club(club).await.unwrap().is_empty());
        assert!(!env.store.is_favorite(parent, club).await.unwrap());
        assert!(env.store.get_club(club).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_child_detaches_applications() {
        let env = TestEnvironment::new().await;
        let organizer = env.organizer().await;
        let parent = env.parent().await;
        let club = env.store.create_club(new_club(organizer, "Акварель")).await.unwrap();
        let child = env
            .store
            .create_child(NewChildProfile {
                parent_id: parent,
                name: "Оля".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2018, 1, 20).unwrap(),
                age: 7,
                interests: None,
                health_info: None,
                additional_info: None,
            })
            .await
            .unwrap();
        let application = env
            .store
            .create_application(NewApplication {
                club_id: club,
                user_id: parent,
                child_id: Some(child),
                message: None,
            })
            .await
            .unwrap();

        env.store.delete_child(child).await.unwrap();

        let application = env.store.get_application(application).await.unwrap();
        assert_eq!(application.child_id, None);
    }

    #[tokio::test]
    async fn test_missing_targets_are_not_found() {
        let env = TestEnvironment::new().await;

        assert!(matches!(
            env.store.delete_club(5).await,
            Err(StoreError::NotFound { entity: "club", id: 5 })
        ));
        assert!(matches!(
            env.store.delete_user(6).await,
            Err(StoreError::NotFound { entity: "user", id: 6 })
        ));
        assert!(matches!(
            env.store.delete_child(7).await,
            Err(StoreError::NotFound { entity: "child", id: 7 })
        ));
    }
}
