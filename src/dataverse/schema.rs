//! Parsed entity and column schema, as persisted in the schema cache file.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute type of a Dataverse column.
///
/// Serialized as the platform's `AttributeType` string so the cache file stays
/// readable next to raw metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeType {
    String,
    Memo,
    Integer,
    BigInt,
    Decimal,
    Double,
    Money,
    Boolean,
    DateTime,
    Picklist,
    State,
    Status,
    Lookup,
    Customer,
    Owner,
    Uniqueidentifier,
    Virtual,
    EntityName,
    Other(String),
}

impl AttributeType {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeType::String => "String",
            AttributeType::Memo => "Memo",
            AttributeType::Integer => "Integer",
            AttributeType::BigInt => "BigInt",
            AttributeType::Decimal => "Decimal",
            AttributeType::Double => "Double",
            AttributeType::Money => "Money",
            AttributeType::Boolean => "Boolean",
            AttributeType::DateTime => "DateTime",
            AttributeType::Picklist => "Picklist",
            AttributeType::State => "State",
            AttributeType::Status => "Status",
            AttributeType::Lookup => "Lookup",
            AttributeType::Customer => "Customer",
            AttributeType::Owner => "Owner",
            AttributeType::Uniqueidentifier => "Uniqueidentifier",
            AttributeType::Virtual => "Virtual",
            AttributeType::EntityName => "EntityName",
            AttributeType::Other(name) => name,
        }
    }

    /// Columns whose values are references to another entity's record.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            AttributeType::Lookup | AttributeType::Customer | AttributeType::Owner
        )
    }
}

impl From<String> for AttributeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "String" => AttributeType::String,
            "Memo" => AttributeType::Memo,
            "Integer" => AttributeType::Integer,
            "BigInt" => AttributeType::BigInt,
            "Decimal" => AttributeType::Decimal,
            "Double" => AttributeType::Double,
            "Money" => AttributeType::Money,
            "Boolean" => AttributeType::Boolean,
            "DateTime" => AttributeType::DateTime,
            "Picklist" => AttributeType::Picklist,
            "State" => AttributeType::State,
            "Status" => AttributeType::Status,
            "Lookup" => AttributeType::Lookup,
            "Customer" => AttributeType::Customer,
            "Owner" => AttributeType::Owner,
            "Uniqueidentifier" => AttributeType::Uniqueidentifier,
            "Virtual" => AttributeType::Virtual,
            "EntityName" => AttributeType::EntityName,
            _ => AttributeType::Other(value),
        }
    }
}

impl From<AttributeType> for String {
    fn from(value: AttributeType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub display_name: String,
    pub logical_name: String,
    /// Name used in `@odata.bind` keys.
    pub schema_name: String,
    pub attribute_type: AttributeType,
    /// Display or logical name of the referenced entity, for lookups.
    #[serde(default)]
    pub related: Option<String>,
}

/// An entity type and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub display_name: String,
    pub logical_name: String,
    /// Column used to address records of this entity in lookup bindings.
    pub key_column: String,
    /// Collection name used in Web API URIs.
    pub entity_set_name: String,
    /// Columns keyed by display name.
    pub columns: BTreeMap<String, ColumnSchema>,
}

/// Entity schemas keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaCache {
    entities: BTreeMap<String, EntitySchema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entity` unless an entity with the same display name exists.
    /// Returns false when it was rejected as a duplicate.
    pub fn insert(&mut self, entity: EntitySchema) -> bool {
        if self.entities.contains_key(&entity.display_name) {
            return false;
        }
        self.entities.insert(entity.display_name.clone(), entity);
        true
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn get(&self, display_name: &str) -> Option<&EntitySchema> {
        self.entities.get(display_name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
