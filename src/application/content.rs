//! Content inventory writes: the point where rename events and cache
//! invalidation enter the system.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::auto_redirect::{AutoRedirector, RenameEvent};
use crate::application::repos::{ContentInventoryWrite, RepoError, UpsertContentItemParams};
use crate::cache::CacheTrigger;
use crate::domain::entities::ContentItemRecord;

pub struct ContentService {
    inventory: Arc<dyn ContentInventoryWrite>,
    auto_redirect: Arc<AutoRedirector>,
    trigger: Arc<CacheTrigger>,
}

impl ContentService {
    pub fn new(
        inventory: Arc<dyn ContentInventoryWrite>,
        auto_redirect: Arc<AutoRedirector>,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            inventory,
            auto_redirect,
            trigger,
        }
    }

    /// Create or update an inventory item.
    ///
    /// When the write renames an item, the rename event is delivered to the
    /// auto-redirector synchronously; a failure there is logged rather than
    /// failing the content write that already landed. Cache scopes for the
    /// item's type (old and new, when the type changed) plus the index are
    /// invalidated on every successful write.
    pub async fn upsert(
        &self,
        params: UpsertContentItemParams,
    ) -> Result<ContentItemRecord, RepoError> {
        let previous = self.inventory.find_item(params.id).await?;
        let record = self.inventory.upsert_item(params).await?;

        if let Some(previous) = previous {
            let event = RenameEvent {
                item_id: record.id,
                address_before: previous.address.clone(),
                address_after: record.address.clone(),
                status_before: previous.status,
                status_after: record.status,
            };
            if let Err(err) = self.auto_redirect.on_rename(&event).await {
                warn!(
                    target = "application::content",
                    item_id = %record.id,
                    error = %err,
                    "auto redirect for rename failed"
                );
            }

            if previous.content_type != record.content_type {
                self.trigger.content_changed(&previous.content_type).await;
            }
        }

        self.trigger.content_changed(&record.content_type).await;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        match self.inventory.delete_item(id).await? {
            Some(record) => {
                self.trigger.content_changed(&record.content_type).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
