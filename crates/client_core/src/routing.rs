//! Navigation surface interpreted by a presentation layer.
//!
//! Controllers never navigate themselves; they hand back a [`Route`] and the
//! caller decides what to do with it.

use std::fmt;

use shared::domain::{Entity, EntityId, Person, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRoutes {
    pub resource: &'static str,
    pub singular: &'static str,
}

impl ResourceRoutes {
    pub fn of<T: Entity>() -> Self {
        Self {
            resource: T::RESOURCE,
            singular: T::SINGULAR,
        }
    }
}

/// Resources with navigable screens, in the order they are matched.
pub fn known_resources() -> [ResourceRoutes; 2] {
    [ResourceRoutes::of::<Person>(), ResourceRoutes::of::<Task>()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/{resource}`
    List(ResourceRoutes),
    /// `/add-{singular}`
    Create(ResourceRoutes),
    /// `/edit-{singular}/{id}`
    Edit(ResourceRoutes, EntityId),
}

impl Route {
    pub fn list_of<T: Entity>() -> Self {
        Self::List(ResourceRoutes::of::<T>())
    }

    pub fn create_of<T: Entity>() -> Self {
        Self::Create(ResourceRoutes::of::<T>())
    }

    pub fn edit_of<T: Entity>(id: EntityId) -> Self {
        Self::Edit(ResourceRoutes::of::<T>(), id)
    }

    /// Where the empty path and unknown paths land.
    pub fn default_route() -> Self {
        Self::list_of::<Person>()
    }

    /// Resolves a path, redirecting anything unrecognised to the default.
    pub fn resolve(path: &str) -> Self {
        Self::parse(path).unwrap_or_else(Self::default_route)
    }

    /// Strict parse; `None` for paths that would be redirected.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_matches('/');
        let mut segments = trimmed.split('/');
        let head = segments.next()?;
        let tail = segments.next();
        if segments.next().is_some() {
            return None;
        }

        for routes in known_resources() {
            match tail {
                None if head == routes.resource => return Some(Self::List(routes)),
                None if head.strip_prefix("add-") == Some(routes.singular) => {
                    return Some(Self::Create(routes))
                }
                Some(raw_id) if head.strip_prefix("edit-") == Some(routes.singular) => {
                    let id = raw_id.parse::<EntityId>().ok()?;
                    return id.is_persisted().then_some(Self::Edit(routes, id));
                }
                _ => {}
            }
        }
        None
    }

    pub fn resource(&self) -> &'static str {
        match self {
            Self::List(routes) | Self::Create(routes) | Self::Edit(routes, _) => routes.resource,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::List(routes) => format!("/{}", routes.resource),
            Self::Create(routes) => format!("/add-{}", routes.singular),
            Self::Edit(routes, id) => format!("/edit-{}/{}", routes.singular, id.0),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
#[path = "tests/routing_tests.rs"]
mod tests;
