//! Typed CRUD client layer for the people and tasks backends.
//!
//! - [`ResourceClient`] issues the list/get/create/update/patch/delete calls
//!   for one collection.
//! - [`ListController`] and [`FormController`] hold the client-side view
//!   state derived from those calls.
//! - [`Route`] is the navigation surface a presentation layer interprets.

pub mod config;
pub mod error;
pub mod form;
pub mod list;
pub mod resource;
pub mod routing;

use std::sync::Arc;

use reqwest::Client;
use shared::domain::{Entity, Person, Task};

pub use config::ClientConfig;
pub use error::ClientError;
pub use form::{FormController, FormMode, FormOutcome, FormState};
pub use list::ListController;
pub use resource::{CrudApi, Operation, ResourceClient};
pub use routing::Route;

/// Entry point holding one shared HTTP pool for every resource.
#[derive(Debug, Clone)]
pub struct CrudClient {
    http: Client,
    config: ClientConfig,
}

impl CrudClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = config.http_client()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resource<T: Entity>(&self) -> Result<ResourceClient<T>, ClientError> {
        ResourceClient::new(self.http.clone(), &self.config)
    }

    pub fn people(&self) -> Result<ResourceClient<Person>, ClientError> {
        self.resource()
    }

    pub fn tasks(&self) -> Result<ResourceClient<Task>, ClientError> {
        self.resource()
    }

    pub fn list_controller<T: Entity>(&self) -> Result<ListController<T>, ClientError> {
        Ok(ListController::new(Arc::new(self.resource::<T>()?)))
    }

    pub fn form_controller<T: Entity>(&self) -> Result<FormController<T>, ClientError> {
        Ok(FormController::new(Arc::new(self.resource::<T>()?)))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
