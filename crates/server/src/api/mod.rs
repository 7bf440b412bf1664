//! Resource operations behind the HTTP handlers: request-body validation and
//! storage calls, with failures expressed as [`ApiError`].

use serde_json::{Map, Value};
use shared::{
    domain::{Entity, EntityId, Person, Task},
    error::{ApiError, FieldErrors},
};
use storage::{EntityStore, Storage};
use tracing::error;

pub const MAX_NAME_CHARS: usize = 255;

const REQUIRED: &str = "This field is required.";
const NOT_AN_OBJECT: &str = "Expected a JSON object.";
const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

/// A record type the backend accepts in request bodies.
pub trait ApiResource: Entity {
    /// Builds a record from a POST/PUT body. Any `id` in the body is ignored.
    fn from_body(body: &Value) -> Result<Self, FieldErrors>;
}

impl ApiResource for Person {
    fn from_body(body: &Value) -> Result<Self, FieldErrors> {
        let fields = as_object(body)?;
        let mut errors = FieldErrors::new();

        let name = match fields.get("name") {
            None | Some(Value::Null) => field_error(&mut errors, "name", REQUIRED),
            Some(Value::String(name)) if name.trim().is_empty() => {
                field_error(&mut errors, "name", "This field may not be blank.")
            }
            Some(Value::String(name)) if name.chars().count() > MAX_NAME_CHARS => field_error(
                &mut errors,
                "name",
                format!("Ensure this field has no more than {MAX_NAME_CHARS} characters."),
            ),
            Some(Value::String(name)) => Some(name.trim().to_string()),
            Some(_) => field_error(&mut errors, "name", "Not a valid string."),
        };

        let age = match fields.get("age") {
            None | Some(Value::Null) => field_error(&mut errors, "age", REQUIRED),
            Some(Value::Number(age)) => match age.as_i64() {
                Some(age) if age < 0 => field_error(
                    &mut errors,
                    "age",
                    "Ensure this value is greater than or equal to 0.",
                ),
                Some(age) => match u32::try_from(age) {
                    Ok(age) => Some(age),
                    Err(_) => field_error(&mut errors, "age", "Ensure this value is not too large."),
                },
                None => field_error(&mut errors, "age", "A valid integer is required."),
            },
            Some(_) => field_error(&mut errors, "age", "A valid integer is required."),
        };

        let email = match fields.get("email") {
            None | Some(Value::Null) => field_error(&mut errors, "email", REQUIRED),
            Some(Value::String(email)) if is_valid_email(email.trim()) => {
                Some(email.trim().to_string())
            }
            Some(_) => field_error(&mut errors, "email", "Enter a valid email address."),
        };

        match (name, age, email) {
            (Some(name), Some(age), Some(email)) if errors.is_empty() => {
                Ok(Person::new(name, age, email))
            }
            _ => Err(errors),
        }
    }
}

impl ApiResource for Task {
    fn from_body(body: &Value) -> Result<Self, FieldErrors> {
        let mut fields = as_object(body)?.clone();
        fields.remove("id");
        Ok(Task::with_fields(fields))
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    body.as_object().ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.insert(NON_FIELD_ERRORS.to_string(), vec![NOT_AN_OBJECT.to_string()]);
        errors
    })
}

fn field_error<T>(errors: &mut FieldErrors, field: &str, message: impl Into<String>) -> Option<T> {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
    None
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Applies the keys of a partial body over the stored record and validates
/// the result as a whole.
pub fn merge_patch<T: ApiResource>(existing: &T, changes: &Value) -> Result<T, ApiError> {
    let changes = as_object(changes).map_err(ApiError::invalid_fields)?;
    let mut merged = serde_json::to_value(existing).map_err(|e| ApiError::internal(e.to_string()))?;
    if let Value::Object(target) = &mut merged {
        for (key, value) in changes {
            if key != "id" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    T::from_body(&merged).map_err(ApiError::invalid_fields)
}

fn internal(resource: &str, err: anyhow::Error) -> ApiError {
    error!(resource, error = %err, "storage failure");
    ApiError::internal(format!("{resource} storage failure"))
}

pub async fn list_records<T>(ctx: &ApiContext) -> Result<Vec<T>, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    EntityStore::<T>::list(&ctx.storage)
        .await
        .map_err(|e| internal(T::RESOURCE, e))
}

pub async fn fetch_record<T>(ctx: &ApiContext, id: EntityId) -> Result<T, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    EntityStore::<T>::fetch(&ctx.storage, id)
        .await
        .map_err(|e| internal(T::RESOURCE, e))?
        .ok_or_else(|| ApiError::not_found(T::RESOURCE, id))
}

pub async fn create_record<T>(ctx: &ApiContext, body: &Value) -> Result<T, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let record = T::from_body(body).map_err(ApiError::invalid_fields)?;
    EntityStore::<T>::insert(&ctx.storage, &record)
        .await
        .map_err(|e| internal(T::RESOURCE, e))
}

pub async fn replace_record<T>(ctx: &ApiContext, id: EntityId, body: &Value) -> Result<T, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    // 404 wins over 400, as with a lookup-then-validate serializer view.
    fetch_record::<T>(ctx, id).await?;
    let record = T::from_body(body).map_err(ApiError::invalid_fields)?;
    store_replacement(ctx, id, &record).await
}

pub async fn patch_record<T>(ctx: &ApiContext, id: EntityId, changes: &Value) -> Result<T, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let existing = fetch_record::<T>(ctx, id).await?;
    let record = merge_patch(&existing, changes)?;
    store_replacement(ctx, id, &record).await
}

async fn store_replacement<T>(ctx: &ApiContext, id: EntityId, record: &T) -> Result<T, ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    EntityStore::<T>::replace(&ctx.storage, id, record)
        .await
        .map_err(|e| internal(T::RESOURCE, e))?
        .ok_or_else(|| ApiError::not_found(T::RESOURCE, id))
}

pub async fn delete_record<T>(ctx: &ApiContext, id: EntityId) -> Result<(), ApiError>
where
    T: ApiResource,
    Storage: EntityStore<T>,
{
    let removed = EntityStore::<T>::remove(&ctx.storage, id)
        .await
        .map_err(|e| internal(T::RESOURCE, e))?;
    if removed {
        Ok(())
    } else {
        Err(ApiError::not_found(T::RESOURCE, id))
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
