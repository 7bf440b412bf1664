use std::{fmt, marker::PhantomData};

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::domain::{Entity, EntityId};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientConfig,
    error::{classify_failure, ClientError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Patch,
    Delete,
}

impl Operation {
    pub fn method(&self) -> Method {
        match self {
            Self::List | Self::Get => Method::GET,
            Self::Create => Method::POST,
            Self::Update => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The CRUD surface controllers depend on. `ResourceClient` is the HTTP
/// implementation; tests substitute in-memory ones.
#[async_trait]
pub trait CrudApi<T: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, ClientError>;
    async fn get(&self, id: EntityId) -> Result<T, ClientError>;
    async fn create(&self, entity: &T) -> Result<T, ClientError>;
    async fn update(&self, entity: &T) -> Result<T, ClientError>;
    async fn delete(&self, id: EntityId) -> Result<(), ClientError>;
}

/// Typed client for one REST collection rooted at `{origin}/api/{resource}/`.
///
/// Every call issues exactly one request and never retries. Clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ResourceClient<T> {
    http: Client,
    collection_url: Url,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(http: Client, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            collection_url: config.resource_url(T::RESOURCE)?,
            _entity: PhantomData,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.http_client()?, config)
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    pub fn item_url(&self, id: EntityId) -> Result<Url, ClientError> {
        self.collection_url
            .join(&format!("{}/", id.0))
            .map_err(|err| ClientError::Config(format!("{} item url: {err}", T::RESOURCE)))
    }

    pub async fn list(&self) -> Result<Vec<T>, ClientError> {
        let url = self.collection_url.clone();
        let response = self.send(Operation::List, None, url, None).await?;
        let items: Vec<T> = self.decode(Operation::List, response).await?;
        for item in &items {
            Self::require_server_id(Operation::List, item)?;
        }
        Ok(items)
    }

    pub async fn get(&self, id: EntityId) -> Result<T, ClientError> {
        let url = self.item_url(id)?;
        let response = self.send(Operation::Get, Some(id), url, None).await?;
        self.decode_entity(Operation::Get, response).await
    }

    /// POSTs the entity with its id stripped; the server assigns one.
    pub async fn create(&self, entity: &T) -> Result<T, ClientError> {
        let mut body = self.encode(entity)?;
        if let Value::Object(fields) = &mut body {
            fields.remove("id");
        }
        let url = self.collection_url.clone();
        let response = self
            .send(Operation::Create, None, url, Some(&body))
            .await?;
        self.decode_entity(Operation::Create, response).await
    }

    pub async fn update(&self, entity: &T) -> Result<T, ClientError> {
        let id = Self::require_persisted(entity.id())?;
        let body = self.encode(entity)?;
        let url = self.item_url(id)?;
        let response = self
            .send(Operation::Update, Some(id), url, Some(&body))
            .await?;
        self.decode_entity(Operation::Update, response).await
    }

    /// Partial update: only the supplied fields are sent.
    pub async fn patch(&self, id: EntityId, fields: Map<String, Value>) -> Result<T, ClientError> {
        let id = Self::require_persisted(id)?;
        let url = self.item_url(id)?;
        let body = Value::Object(fields);
        let response = self
            .send(Operation::Patch, Some(id), url, Some(&body))
            .await?;
        self.decode_entity(Operation::Patch, response).await
    }

    pub async fn delete(&self, id: EntityId) -> Result<(), ClientError> {
        let url = self.item_url(id)?;
        self.send(Operation::Delete, Some(id), url, None).await?;
        Ok(())
    }

    fn require_persisted(id: EntityId) -> Result<EntityId, ClientError> {
        if id.is_persisted() {
            Ok(id)
        } else {
            Err(ClientError::NotFound {
                resource: T::RESOURCE,
                id,
            })
        }
    }

    /// Records coming back from the server must carry a positive id.
    fn require_server_id(operation: Operation, entity: &T) -> Result<(), ClientError> {
        if entity.is_persisted() {
            return Ok(());
        }
        Err(ClientError::MalformedResponse {
            resource: T::RESOURCE,
            message: format!(
                "{operation} returned an entity without a persisted id ({})",
                entity.id()
            ),
        })
    }

    fn encode(&self, entity: &T) -> Result<Value, ClientError> {
        serde_json::to_value(entity).map_err(|err| ClientError::Encode {
            resource: T::RESOURCE,
            message: err.to_string(),
        })
    }

    async fn send(
        &self,
        operation: Operation,
        id: Option<EntityId>,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        debug!(resource = T::RESOURCE, %operation, method = %operation.method(), %url, ?id, "dispatching request");

        let mut request = self.http.request(operation.method(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(resource = T::RESOURCE, %operation, error = %err, "request failed before a response arrived");
            ClientError::Transport {
                resource: T::RESOURCE,
                operation,
                status: err.status().map(|status| status.as_u16()),
                message: err.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_failure(T::RESOURCE, operation, id, status, &body);
        warn!(resource = T::RESOURCE, %operation, status = status.as_u16(), error = %error, "request rejected");
        Err(error)
    }

    async fn decode_entity(&self, operation: Operation, response: Response) -> Result<T, ClientError> {
        let entity: T = self.decode(operation, response).await?;
        Self::require_server_id(operation, &entity)?;
        Ok(entity)
    }

    async fn decode<R: DeserializeOwned>(
        &self,
        operation: Operation,
        response: Response,
    ) -> Result<R, ClientError> {
        let bytes = response.bytes().await.map_err(|err| ClientError::Transport {
            resource: T::RESOURCE,
            operation,
            status: None,
            message: format!("failed to read response body: {err}"),
        })?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::MalformedResponse {
            resource: T::RESOURCE,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl<T: Entity> CrudApi<T> for ResourceClient<T> {
    async fn list(&self) -> Result<Vec<T>, ClientError> {
        ResourceClient::list(self).await
    }

    async fn get(&self, id: EntityId) -> Result<T, ClientError> {
        ResourceClient::get(self, id).await
    }

    async fn create(&self, entity: &T) -> Result<T, ClientError> {
        ResourceClient::create(self, entity).await
    }

    async fn update(&self, entity: &T) -> Result<T, ClientError> {
        ResourceClient::update(self, entity).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), ClientError> {
        ResourceClient::delete(self, id).await
    }
}

#[cfg(test)]
#[path = "tests/resource_tests.rs"]
mod tests;
