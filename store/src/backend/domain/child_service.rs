use shared::{ChildProfile, NewChildProfile};
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::integrity;
use super::live_query::Table;
use super::store::ClubStore;
use crate::backend::storage::ChildRepository;

impl ClubStore {
    /// Register a child for a parent account.
    ///
    /// `age` is stored as given; use [`ChildProfile::age_on`] to derive it.
    pub async fn create_child(&self, child: NewChildProfile) -> StoreResult<i64> {
        info!("Creating child: name={}, parent={}", child.name, child.parent_id);

        let id = self
            .run_write("create_child", move |mut unit| async move {
                integrity::check_new_child(&mut unit, &child).await?;
                let id = ChildRepository::insert(unit.conn(), &child).await?;
                unit.touch(Table::Children);
                Ok::<_, StoreError>((id, unit))
            })
            .await?;

        info!("Created child with ID: {}", id);
        Ok(id)
    }

    pub async fn update_child(&self, child: ChildProfile) -> StoreResult<()> {
        info!("Updating child: {}", child.id);

        self.run_write("update_child", move |mut unit| async move {
            if ChildRepository::find_by_id(unit.conn(), child.id).await?.is_none() {
                return Err(StoreError::NotFound { entity: "child", id: child.id });
            }
            integrity::check_child_update(&mut unit, &child).await?;
            ChildRepository::update(unit.conn(), &child).await?;
            unit.touch(Table::Children);
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    /// Delete a child profile. Applications filed for the child stay, without the child.
    pub async fn delete_child(&self, id: i64) -> StoreResult<()> {
        info!("Deleting child: {}", id);

        self.run_write("delete_child", move |mut unit| async move {
            if !integrity::delete_child(&mut unit, id).await? {
                warn!("Child not found: {}", id);
                return Err(StoreError::NotFound { entity: "child", id });
            }
            Ok::<_, StoreError>(((), unit))
        })
        .await
    }

    pub async fn get_child(&self, id: i64) -> StoreResult<ChildProfile> {
        ChildRepository::find_by_id(self.pool(), id)
            .await?
            .ok_or(StoreError::NotFound { entity: "child", id })
    }

    pub async fn get_children_for_parent(&self, parent_id: i64) -> StoreResult<Vec<ChildProfile>> {
        let children = ChildRepository::list_by_parent(self.pool(), parent_id).await?;
        info!("Found {} children for parent {}", children.len(), parent_id);
        Ok(children)
    }
}
