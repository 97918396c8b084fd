//! The set of mounted resources

use std::sync::Arc;

use super::{FactoryError, Resource};

/// Resources in registration order, keyed by URL name
#[derive(Debug, Default, Clone)]
pub struct Registry {
    resources: Vec<Arc<Resource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; names must be unique
    pub fn register(&mut self, resource: Resource) -> Result<&mut Self, FactoryError> {
        if self.get(resource.name()).is_some() {
            return Err(FactoryError::DuplicateResource(resource.name()));
        }
        tracing::debug!(resource = resource.name(), table = resource.schema().table, "Registered resource");
        self.resources.push(Arc::new(resource));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Resource>> {
        self.resources.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
