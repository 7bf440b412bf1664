use std::sync::Arc;

use shared::domain::{Entity, EntityId};
use tracing::{debug, info};

use crate::{error::ClientError, resource::CrudApi, routing::Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Uninitialized,
    Loading,
    CreateReady,
    EditReady,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(EntityId),
}

/// Result of a successful save. `next` is where the presentation layer
/// should go; the controller itself never navigates.
#[derive(Debug, Clone, PartialEq)]
pub struct FormOutcome<T> {
    pub entity: T,
    pub mode: FormMode,
    pub next: Route,
}

pub struct FormController<T: Entity> {
    api: Arc<dyn CrudApi<T>>,
    entity: T,
    mode: FormMode,
    state: FormState,
    // Set once `entity` holds something worth saving: a fresh default in
    // create mode or a fetched record in edit mode.
    loaded: bool,
}

impl<T: Entity> FormController<T> {
    pub fn new(api: Arc<dyn CrudApi<T>>) -> Self {
        Self {
            api,
            entity: T::default(),
            mode: FormMode::Create,
            state: FormState::Uninitialized,
            loaded: false,
        }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut T {
        &mut self.entity
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// With an id the form edits that record, fetched fresh from the
    /// server; without one it starts from a default entity.
    pub async fn init(&mut self, id: Option<EntityId>) -> Result<(), ClientError> {
        self.entity = T::default();
        self.loaded = false;

        let Some(id) = id else {
            self.mode = FormMode::Create;
            self.state = FormState::CreateReady;
            self.loaded = true;
            return Ok(());
        };

        self.mode = FormMode::Edit(id);
        self.state = FormState::Loading;
        match self.api.get(id).await {
            Ok(entity) => {
                debug!(resource = T::RESOURCE, %id, "form loaded");
                self.entity = entity;
                self.state = FormState::EditReady;
                self.loaded = true;
                Ok(())
            }
            Err(err) => {
                self.state = FormState::Error;
                Err(err)
            }
        }
    }

    /// Creates or updates depending on the mode. A failed save leaves the
    /// entity untouched and may be retried by calling `save` again.
    pub async fn save(&mut self) -> Result<FormOutcome<T>, ClientError> {
        let ready = match self.state {
            FormState::CreateReady | FormState::EditReady => true,
            FormState::Error => self.loaded,
            _ => false,
        };
        if !ready {
            return Err(ClientError::NotReady { state: self.state });
        }

        let result = match self.mode {
            FormMode::Create => self.api.create(&self.entity).await,
            FormMode::Edit(_) => self.api.update(&self.entity).await,
        };

        match result {
            Ok(saved) => {
                info!(resource = T::RESOURCE, id = %saved.id(), mode = ?self.mode, "form saved");
                self.entity = saved.clone();
                self.state = FormState::Done;
                Ok(FormOutcome {
                    entity: saved,
                    mode: self.mode,
                    next: Route::list_of::<T>(),
                })
            }
            Err(err) => {
                self.state = FormState::Error;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
