//! Display-name and logical-name resolution against the schema cache.
//!
//! Exact display-name hits win; otherwise a linear scan matches logical
//! names. A miss is always an error, never a default.

use crate::dataverse::schema::{ColumnSchema, EntitySchema, SchemaCache};
use crate::error::DataverseError;

impl SchemaCache {
    /// Find an entity by display name, falling back to logical name.
    pub fn resolve_entity(&self, name: &str) -> Result<&EntitySchema, DataverseError> {
        if let Some(entity) = self.get(name) {
            return Ok(entity);
        }

        self.entities()
            .find(|entity| entity.logical_name == name)
            .ok_or_else(|| DataverseError::EntityNotFound {
                name: name.to_string(),
            })
    }
}

impl EntitySchema {
    /// Find a column by display name, falling back to logical name.
    pub fn resolve_column(&self, name: &str) -> Result<&ColumnSchema, DataverseError> {
        if let Some(column) = self.columns.get(name) {
            return Ok(column);
        }

        self.columns
            .values()
            .find(|column| column.logical_name == name)
            .ok_or_else(|| DataverseError::ColumnNotFound {
                column: name.to_string(),
                entity: self.display_name.clone(),
            })
    }
}
