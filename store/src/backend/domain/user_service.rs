use chrono::Utc;
use shared::{NewUser, User, UserRole};
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::integrity::{self, CascadeReport};
use super::live_query::Table;
use super::store::ClubStore;
use crate::backend::storage::UserRepository;

impl ClubStore {
    /// Register a new user. A phone that is already taken is rejected.
    pub async fn create_user(&self, user: NewUser) -> StoreResult<i64> {
        info!("Creating user: role={}, phone={}", user.role, user.phone);

        let id = self
            .run_write("create_user", move |mut unit| async move {
                integrity::check_new_user(&mut unit, &user).await?;
                let id = UserRepository::insert(unit.conn(), &user, Utc::now()).await?;
                unit.touch(Table::Users);
                Ok::<_, StoreError>((id, unit))
            })
            .await?;

        info!("Created user with ID: {}", id);
        Ok(id)
    }

    /// Overwrite every field of an existing user but its id.
    ///
    /// An empty password keeps the stored one. A user who still organizes
    /// clubs cannot take a role that may not own them.
    pub async fn update_user(&self, mut user: User) -> StoreResult<()> {
        info!("Updating user: {}", user.id);

        self.run_write("update_user", move |mut unit| async move {
            let stored = UserRepository::find_by_id(unit.conn(), user.id)
                .await?
                .ok_or(StoreError::NotFound { entity: "user", id: user.id })?;
            if user.password.is_empty() {
                user.password = stored.password;
            }
            integrity::check_user_update(&mut unit, &user).await?;
            UserRepository::update(unit.conn(), &user).await?;
            unit.touch(Table::Users);
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    /// Delete a user together with everything they own
    pub async fn delete_user(&self, id: i64) -> StoreResult<CascadeReport> {
        info!("Deleting user: {}", id);

        self.run_write("delete_user", move |mut unit| async move {
            let report = integrity::cascade_delete_user(&mut unit, id)
                .await?
                .ok_or(StoreError::NotFound { entity: "user", id })?;
            Ok::<_, StoreError>((report, unit))
        })
        .await
    }

    pub async fn get_user(&self, id: i64) -> StoreResult<User> {
        UserRepository::find_by_id(self.pool(), id)
            .await?
            .ok_or(StoreError::NotFound { entity: "user", id })
    }

    pub async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        Ok(UserRepository::find_by_phone(self.pool(), phone).await?)
    }

    pub async fn is_phone_registered(&self, phone: &str) -> StoreResult<bool> {
        Ok(self.find_user_by_phone(phone).await?.is_some())
    }

    pub async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        Ok(UserRepository::list_all(self.pool()).await?)
    }

    pub async fn get_users_by_role(&self, role: UserRole) -> StoreResult<Vec<User>> {
        Ok(UserRepository::list_by_role(self.pool(), role).await?)
    }

    /// Look a user up by phone and compare the stored credential verbatim
    pub async fn authenticate(&self, phone: &str, password: &str) -> StoreResult<Option<User>> {
        let user = self
            .find_user_by_phone(phone)
            .await?
            .filter(|user| user.password == password);

        if user.is_none() {
            warn!("Login failed for phone {}", phone);
        }
        Ok(user)
    }
}
