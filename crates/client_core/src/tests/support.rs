use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use shared::domain::{Entity, EntityId};
use tokio::sync::Mutex;

use crate::{
    error::ClientError,
    resource::{CrudApi, Operation},
};

/// In-memory `CrudApi` with one-shot failure injection and a call log.
pub(crate) struct FakeApi<T> {
    records: Mutex<BTreeMap<i64, T>>,
    next_id: Mutex<i64>,
    failures: Mutex<HashMap<Operation, ClientError>>,
    pub(crate) calls: Mutex<Vec<Operation>>,
}

impl<T: Entity> FakeApi<T> {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(1),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn seed(&self, entity: T) -> EntityId {
        let mut next_id = self.next_id.lock().await;
        let id = EntityId(*next_id);
        *next_id += 1;
        let mut entity = entity;
        entity.set_id(id);
        self.records.lock().await.insert(id.0, entity);
        id
    }

    pub(crate) async fn fail_next(&self, operation: Operation, error: ClientError) {
        self.failures.lock().await.insert(operation, error);
    }

    pub(crate) async fn stored(&self, id: EntityId) -> Option<T> {
        self.records.lock().await.get(&id.0).cloned()
    }

    pub(crate) async fn call_log(&self) -> Vec<Operation> {
        self.calls.lock().await.clone()
    }

    async fn begin(&self, operation: Operation) -> Result<(), ClientError> {
        self.calls.lock().await.push(operation);
        match self.failures.lock().await.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn not_found(id: EntityId) -> ClientError {
        ClientError::NotFound {
            resource: T::RESOURCE,
            id,
        }
    }
}

#[async_trait]
impl<T: Entity> CrudApi<T> for FakeApi<T> {
    async fn list(&self) -> Result<Vec<T>, ClientError> {
        self.begin(Operation::List).await?;
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn get(&self, id: EntityId) -> Result<T, ClientError> {
        self.begin(Operation::Get).await?;
        self.stored(id).await.ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, entity: &T) -> Result<T, ClientError> {
        self.begin(Operation::Create).await?;
        let id = self.seed(entity.clone()).await;
        self.stored(id).await.ok_or_else(|| Self::not_found(id))
    }

    async fn update(&self, entity: &T) -> Result<T, ClientError> {
        self.begin(Operation::Update).await?;
        let id = entity.id();
        let mut records = self.records.lock().await;
        match records.get_mut(&id.0) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity.clone())
            }
            None => Err(Self::not_found(id)),
        }
    }

    async fn delete(&self, id: EntityId) -> Result<(), ClientError> {
        self.begin(Operation::Delete).await?;
        self.records
            .lock()
            .await
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

pub(crate) fn transport_failure(resource: &'static str, operation: Operation) -> ClientError {
    ClientError::Transport {
        resource,
        operation,
        status: Some(500),
        message: "500 Internal Server Error".to_string(),
    }
}
