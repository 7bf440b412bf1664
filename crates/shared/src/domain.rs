use std::{fmt, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Server-assigned record identifier. Zero means "not yet persisted".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl EntityId {
    pub const UNSAVED: EntityId = EntityId(0);

    pub fn is_persisted(&self) -> bool {
        self.0 > 0
    }

    pub fn is_unsaved(&self) -> bool {
        !self.is_persisted()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entity id '{0}'")]
pub struct InvalidEntityId(pub String);

impl FromStr for EntityId {
    type Err = InvalidEntityId;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| InvalidEntityId(raw.to_string()))
    }
}

/// A record type served by one REST collection.
pub trait Entity:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection name as it appears in `/api/{resource}/`.
    const RESOURCE: &'static str;
    /// Singular form used by the navigation routes (`/add-{singular}`).
    const SINGULAR: &'static str;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    fn is_persisted(&self) -> bool {
        self.id().is_persisted()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "EntityId::is_unsaved")]
    pub id: EntityId,
    pub name: String,
    pub age: u32,
    pub email: String,
}

impl Person {
    pub fn new(name: impl Into<String>, age: u32, email: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNSAVED,
            name: name.into(),
            age,
            email: email.into(),
        }
    }
}

impl Entity for Person {
    const RESOURCE: &'static str = "people";
    const SINGULAR: &'static str = "person";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// A task record. The tasks collection has no fixed schema, so everything
/// except `id` is kept as an opaque JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "EntityId::is_unsaved")]
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Task {
    /// An `id` key in `fields` is dropped; only the server assigns ids.
    pub fn with_fields(mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: EntityId::UNSAVED,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Entity for Task {
    const RESOURCE: &'static str = "tasks";
    const SINGULAR: &'static str = "task";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
