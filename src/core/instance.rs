//! Catalog instances
//!
//! Requests address a catalog through a numeric instance id. [`Instances`]
//! owns the catalogs; there is no process-wide registry.

use std::collections::BTreeMap;

use crate::error::CommandError;

use super::catalog::Catalog;

/// Owner of the catalogs requests can address
#[derive(Debug, Default)]
pub struct Instances {
    next_id: u32,
    catalogs: BTreeMap<u32, Catalog>,
}

impl Instances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog and return its instance id
    pub fn create(&mut self, catalog: Catalog) -> u32 {
        self.next_id += 1;
        self.catalogs.insert(self.next_id, catalog);
        self.next_id
    }

    /// Catalog of an instance
    pub fn get(&self, id: u32) -> Result<&Catalog, CommandError> {
        self.catalogs
            .get(&id)
            .ok_or(CommandError::InvalidInstance { id })
    }

    /// Mutable catalog of an instance
    pub fn get_mut(&mut self, id: u32) -> Result<&mut Catalog, CommandError> {
        self.catalogs
            .get_mut(&id)
            .ok_or(CommandError::InvalidInstance { id })
    }

    /// Drop an instance, returning its catalog
    pub fn destroy(&mut self, id: u32) -> Result<Catalog, CommandError> {
        self.catalogs
            .remove(&id)
            .ok_or(CommandError::InvalidInstance { id })
    }
}
