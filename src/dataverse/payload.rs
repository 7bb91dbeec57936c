//! Compiles tabular rows into Web API create payloads.
//!
//! Plain columns are emitted under their logical name with the value
//! untouched. Reference columns become `<SchemaName>@odata.bind` entries whose
//! value addresses the related record by its key column, e.g.
//! `/able_states(able_name='Arizona')`.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::dataverse::schema::{AttributeType, ColumnSchema, EntitySchema, SchemaCache};
use crate::error::DataverseError;

/// Suffix marking a reference-binding key.
pub const BIND_SUFFIX: &str = "@odata.bind";

/// One input record: column display (or logical) name to scalar value.
pub type Row = Map<String, Value>;

/// Wire body of a create request. Keys serialize in sorted order.
pub type Payload = Map<String, Value>;

/// How a key value is written inside a binding path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyLiteral {
    Quoted,
    Number { integral: bool },
    Guid,
}

impl KeyLiteral {
    fn for_type(attribute_type: &AttributeType) -> Self {
        match attribute_type {
            AttributeType::Uniqueidentifier => KeyLiteral::Guid,
            AttributeType::Integer | AttributeType::BigInt => KeyLiteral::Number { integral: true },
            AttributeType::Decimal | AttributeType::Double | AttributeType::Money => {
                KeyLiteral::Number { integral: false }
            }
            AttributeType::String
            | AttributeType::Memo
            | AttributeType::Boolean
            | AttributeType::DateTime
            | AttributeType::Picklist
            | AttributeType::State
            | AttributeType::Status
            | AttributeType::Lookup
            | AttributeType::Customer
            | AttributeType::Owner
            | AttributeType::Virtual
            | AttributeType::EntityName
            | AttributeType::Other(_) => KeyLiteral::Quoted,
        }
    }
}

/// Turns rows into payloads using a loaded schema.
pub struct PayloadCompiler<'a> {
    schema: &'a SchemaCache,
}

impl<'a> PayloadCompiler<'a> {
    pub fn new(schema: &'a SchemaCache) -> Self {
        Self { schema }
    }

    /// Compile one row for `entity`. Null fields are left out entirely.
    ///
    /// Two non-null fields naming the same column (a display name and its
    /// logical name, say) fail with [`DataverseError::DuplicateColumn`].
    pub fn compile(&self, entity: &EntitySchema, row: &Row) -> Result<Payload, DataverseError> {
        let mut payload = Payload::new();
        let mut sources: BTreeMap<&str, &str> = BTreeMap::new();

        for (field, value) in row {
            if value.is_null() {
                continue;
            }

            let column = entity.resolve_column(field)?;
            if let Some(first) = sources.insert(&column.logical_name, field) {
                return Err(DataverseError::DuplicateColumn {
                    column: column.logical_name.clone(),
                    entity: entity.display_name.clone(),
                    first: first.to_string(),
                    second: field.clone(),
                });
            }

            if column.attribute_type.is_reference() {
                let (key, path) = self.bind(entity, column, value)?;
                payload.insert(key, Value::String(path));
            } else {
                payload.insert(column.logical_name.clone(), value.clone());
            }
        }

        Ok(payload)
    }

    /// Compile every row, stopping at the first failure.
    pub fn compile_all(
        &self,
        entity: &EntitySchema,
        rows: &[Row],
    ) -> Result<Vec<Payload>, DataverseError> {
        rows.iter().map(|row| self.compile(entity, row)).collect()
    }

    fn bind(
        &self,
        entity: &EntitySchema,
        column: &ColumnSchema,
        value: &Value,
    ) -> Result<(String, String), DataverseError> {
        let related_name =
            column
                .related
                .as_deref()
                .ok_or_else(|| DataverseError::MissingLookupTarget {
                    column: column.display_name.clone(),
                    entity: entity.display_name.clone(),
                })?;

        let related = self.schema.resolve_entity(related_name)?;
        let literal = key_literal(related, value)?;

        Ok((
            format!("{}{}", column.schema_name, BIND_SUFFIX),
            format!(
                "/{}({}={})",
                related.entity_set_name, related.key_column, literal
            ),
        ))
    }
}

/// Encode `value` as an OData key literal for `related.key_column`.
///
/// Key columns missing from the cached columns are treated as text.
fn key_literal(related: &EntitySchema, value: &Value) -> Result<String, DataverseError> {
    let encoding = related
        .resolve_column(&related.key_column)
        .map(|column| KeyLiteral::for_type(&column.attribute_type))
        .unwrap_or(KeyLiteral::Quoted);

    let text = scalar_text(value);
    let invalid = |message: String| DataverseError::InvalidLookupKey {
        entity: related.display_name.clone(),
        key_column: related.key_column.clone(),
        value: value.to_string(),
        message,
    };

    match encoding {
        KeyLiteral::Quoted => Ok(format!("'{}'", text.replace('\'', "''"))),
        KeyLiteral::Guid => {
            let trimmed = text.trim().trim_matches(|ch| ch == '{' || ch == '}');
            Uuid::parse_str(trimmed)
                .map(|id| id.hyphenated().to_string())
                .map_err(|e| invalid(e.to_string()))
        }
        KeyLiteral::Number { integral } => {
            let trimmed = text.trim();
            let number = Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|e| invalid(e.to_string()))?;
            if integral && !number.fract().is_zero() {
                return Err(invalid("expected a whole number".to_string()));
            }
            Ok(number.normalize().to_string())
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
