use std::sync::Arc;

use shared::domain::{Entity, EntityId};
use tracing::debug;

use crate::{error::ClientError, resource::CrudApi};

/// Holds one fetched collection. Every successful refresh replaces it whole.
pub struct ListController<T: Entity> {
    api: Arc<dyn CrudApi<T>>,
    items: Vec<T>,
}

impl<T: Entity> ListController<T> {
    pub fn new(api: Arc<dyn CrudApi<T>>) -> Self {
        Self {
            api,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// On failure the previous items are kept.
    pub async fn refresh(&mut self) -> Result<&[T], ClientError> {
        let items = self.api.list().await?;
        debug!(resource = T::RESOURCE, count = items.len(), "list refreshed");
        self.items = items;
        Ok(&self.items)
    }

    /// Deletes on the server, then re-fetches. Nothing is removed locally
    /// before the server confirms.
    pub async fn remove(&mut self, id: EntityId) -> Result<&[T], ClientError> {
        self.api.delete(id).await?;
        debug!(resource = T::RESOURCE, %id, "deleted; refreshing list");
        self.refresh().await
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
