//! URL layout shared by the client and the reference backend.

use crate::domain::EntityId;

pub const API_PREFIX: &str = "/api";

/// `/api/{resource}/`
pub fn collection_path(resource: &str) -> String {
    format!("{API_PREFIX}/{resource}/")
}

/// `/api/{resource}/{id}/`
pub fn item_path(resource: &str, id: EntityId) -> String {
    format!("{API_PREFIX}/{resource}/{}/", id.0)
}

/// Route template for the reference backend's router.
pub fn item_route(resource: &str) -> String {
    format!("{API_PREFIX}/{resource}/:id/")
}
