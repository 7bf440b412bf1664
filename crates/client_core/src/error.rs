use reqwest::StatusCode;
use shared::{
    domain::EntityId,
    error::{ApiError, FieldErrors},
};
use thiserror::Error;

use crate::{form::FormState, resource::Operation};

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("{operation} {resource} failed: {message}")]
    Transport {
        resource: &'static str,
        operation: Operation,
        status: Option<u16>,
        message: String,
    },
    #[error("{resource} {id} not found")]
    NotFound {
        resource: &'static str,
        id: EntityId,
    },
    #[error("{resource} rejected by server ({status}): {message}")]
    Validation {
        resource: &'static str,
        status: u16,
        message: String,
        fields: FieldErrors,
    },
    #[error("malformed {resource} response: {message}")]
    MalformedResponse {
        resource: &'static str,
        message: String,
    },
    #[error("failed to encode {resource} payload: {message}")]
    Encode {
        resource: &'static str,
        message: String,
    },
    #[error("form cannot be saved while {state:?}")]
    NotReady { state: FormState },
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Per-field messages for a validation failure, empty otherwise.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Maps a non-2xx response onto the error taxonomy. Which statuses count as
/// "not found" or "validation" depends on the operation: a listing has no
/// entity to miss and a read never validates input.
pub(crate) fn classify_failure(
    resource: &'static str,
    operation: Operation,
    id: Option<EntityId>,
    status: StatusCode,
    body: &str,
) -> ClientError {
    let not_found = status == StatusCode::NOT_FOUND
        && matches!(
            operation,
            Operation::Get | Operation::Update | Operation::Patch | Operation::Delete
        );
    if not_found {
        return ClientError::NotFound {
            resource,
            id: id.unwrap_or(EntityId::UNSAVED),
        };
    }

    let validates = matches!(
        operation,
        Operation::Create | Operation::Update | Operation::Patch
    );
    if validates && status.is_client_error() {
        let (message, fields) = validation_details(status, body);
        return ClientError::Validation {
            resource,
            status: status.as_u16(),
            message,
            fields,
        };
    }

    ClientError::Transport {
        resource,
        operation,
        status: Some(status.as_u16()),
        message: failure_message(status, body),
    }
}

fn validation_details(status: StatusCode, body: &str) -> (String, FieldErrors) {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return (api_error.message, api_error.fields);
    }
    // Serializer-style bodies: `{"email": ["Enter a valid email address."]}`.
    if let Ok(fields) = serde_json::from_str::<FieldErrors>(body) {
        if !fields.is_empty() {
            let names = fields.keys().cloned().collect::<Vec<_>>().join(", ");
            return (format!("invalid fields: {names}"), fields);
        }
    }
    (failure_message(status, body), FieldErrors::new())
}

fn failure_message(status: StatusCode, body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return format!("{status}: {}", api_error.message);
    }
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    }
}
