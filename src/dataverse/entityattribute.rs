use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataverse::entitydefinition::localized_label;

/// Dataverse attribute metadata as returned by `EntityDefinitions?$expand=Attributes`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntityAttribute {
    /// Logical name of the attribute.
    #[serde(rename = "LogicalName")]
    pub logical_name: String,
    /// Schema name of the attribute.
    #[serde(rename = "SchemaName")]
    pub schema_name: String,
    /// Attribute type name.
    #[serde(rename = "AttributeType")]
    pub attribute_type: Option<String>,
    /// Display name payload.
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<Value>,
    /// Parent attribute when this is part of a compound attribute.
    #[serde(rename = "AttributeOf", default)]
    pub attribute_of: Option<String>,
    /// Target entity logical names of a lookup.
    #[serde(rename = "Targets", default)]
    pub targets: Option<Vec<String>>,
}

impl EntityAttribute {
    /// User-localized display label, or an empty string.
    pub fn label(&self) -> String {
        localized_label(self.display_name.as_ref())
    }

    /// True for sub-attributes such as the `...name` companion of a lookup.
    pub fn is_sub_attribute(&self) -> bool {
        self.attribute_of
            .as_deref()
            .is_some_and(|parent| !parent.is_empty())
    }
}
