//! Enrollment application lifecycle.
//!
//! ```text
//! Pending ──► Approved
//!    │
//!    ├──────► Rejected
//!    │
//!    └──────► Cancelled
//! ```
//!
//! Every application starts as `Pending`. The three other states are final.

use chrono::Utc;
use shared::{Application, ApplicationStatus, NewApplication};
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::integrity;
use super::live_query::Table;
use super::store::ClubStore;
use crate::backend::storage::ApplicationRepository;

/// Whether an application in `from` may move to `to`
pub fn check_transition(from: ApplicationStatus, to: ApplicationStatus) -> StoreResult<()> {
    if from.is_terminal() || to == ApplicationStatus::Pending {
        return Err(StoreError::InvalidTransition { from, to });
    }
    Ok(())
}

impl ClubStore {
    /// File an application. The status is always `Pending` on creation.
    pub async fn create_application(&self, application: NewApplication) -> StoreResult<i64> {
        info!(
            "Creating application: club={}, applicant={}, child={:?}",
            application.club_id, application.user_id, application.child_id
        );

        let id = self
            .run_write("create_application", move |mut unit| async move {
                integrity::check_new_application(&mut unit, &application).await?;
                let id = ApplicationRepository::insert(unit.conn(), &application, Utc::now()).await?;
                unit.touch(Table::Applications);
                Ok::<_, StoreError>((id, unit))
            })
            .await?;

        info!("Created application with ID: {}", id);
        Ok(id)
    }

    /// Move an application to `status`, returning the updated row
    pub async fn set_application_status(&self, id: i64, status: ApplicationStatus) -> StoreResult<Application> {
        info!("Setting application {} status to {}", id, status);

        self.run_write("set_application_status", move |mut unit| async move {
            let current = ApplicationRepository::find_by_id(unit.conn(), id)
                .await?
                .ok_or(StoreError::NotFound { entity: "application", id })?;

            if let Err(e) = check_transition(current.status, status) {
                warn!("Rejected status change of application {}: {}", id, e);
                return Err(e);
            }

            ApplicationRepository::set_status(unit.conn(), id, status).await?;
            unit.touch(Table::Applications);
            Ok::<_, StoreError>((Application { status, ..current }, unit))
        })
        .await
    }

    pub async fn get_application(&self, id: i64) -> StoreResult<Application> {
        ApplicationRepository::find_by_id(self.pool(), id)
            .await?
            .ok_or(StoreError::NotFound { entity: "application", id })
    }

    pub async fn get_applications_for_user(&self, user_id: i64) -> StoreResult<Vec<Application>> {
        Ok(ApplicationRepository::list_by_user(self.pool(), user_id).await?)
    }

    pub async fn get_applications_for_club(&self, club_id: i64) -> StoreResult<Vec<Application>> {
        Ok(ApplicationRepository::list_by_club(self.pool(), club_id).await?)
    }

    /// Applications to every club the organizer owns
    pub async fn get_applications_for_clubs_owned_by(&self, organizer_id: i64) -> StoreResult<Vec<Application>> {
        Ok(ApplicationRepository::list_for_organizer(self.pool(), organizer_id).await?)
    }
}
