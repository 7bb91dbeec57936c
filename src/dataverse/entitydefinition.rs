use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataverse::entityattribute::EntityAttribute;

/// Dataverse entity definition metadata, expanded with its attributes.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Logical name of the entity.
    #[serde(rename = "LogicalName")]
    pub logical_name: String,
    /// Display name payload.
    #[serde(rename = "DisplayName")]
    pub display_name: Option<Value>,
    /// Entity set (collection) name.
    #[serde(rename = "EntitySetName")]
    pub entity_set_name: String,
    /// Primary name attribute logical name.
    #[serde(rename = "PrimaryNameAttribute", default)]
    pub primary_name_attribute: Option<String>,
    /// Expanded attribute list.
    #[serde(rename = "Attributes", default)]
    pub attributes: Vec<EntityAttribute>,
}

impl EntityDefinition {
    /// User-localized display label, or an empty string.
    pub fn label(&self) -> String {
        localized_label(self.display_name.as_ref())
    }
}

/// Read `UserLocalizedLabel.Label` out of a `DisplayName` payload.
pub(crate) fn localized_label(display_name: Option<&Value>) -> String {
    display_name
        .and_then(|name| name.get("UserLocalizedLabel"))
        .and_then(|label| label.get("Label"))
        .and_then(|label| label.as_str())
        .unwrap_or_default()
        .to_string()
}
