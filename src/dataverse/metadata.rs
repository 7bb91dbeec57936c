use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::Value;

use crate::dataverse::entityattribute::EntityAttribute;
use crate::dataverse::entitydefinition::EntityDefinition;
use crate::dataverse::schema::{ColumnSchema, EntitySchema, SchemaCache};
use crate::dataverse::store::CacheStore;
use crate::dataverse::transport::{query, Transport};
use crate::error::DataverseError;

/// Cache key of the parsed schema.
pub const SCHEMA_CACHE_KEY: &str = "entities.json";
/// Cache key of the raw, unfiltered metadata response.
pub const SCHEMA_DEBUG_KEY: &str = "entities_debug.json";

const DEFAULT_PREFIX: &str = "able_";
const DEFAULT_MAX_AGE_HOURS: i64 = 1;

/// Controls which entities are kept and how long a cached schema is trusted.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// Logical-name prefix of the entities to keep.
    pub prefix: String,
    pub max_age: Duration,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
        }
    }
}

/// Load the schema from `store` when fresh, otherwise fetch it once from the
/// Web API and persist it.
pub async fn load_schema<T, S>(
    transport: &T,
    store: &S,
    options: &SchemaOptions,
) -> Result<SchemaCache, DataverseError>
where
    T: Transport + ?Sized,
    S: CacheStore + ?Sized,
{
    if store.is_fresh(SCHEMA_CACHE_KEY, options.max_age) {
        match read_cached(store) {
            Ok(Some(schema)) => {
                log::info!(
                    "Loaded {} entity definitions from cache",
                    schema.len()
                );
                return Ok(schema);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring unreadable schema cache: {}", e),
        }
    }

    let body = query(
        transport,
        "EntityDefinitions",
        &[("$expand", "Attributes,OneToManyRelationships")],
    )
    .await?;

    if let Err(e) = store.put(SCHEMA_DEBUG_KEY, &body) {
        log::warn!("Failed to write {}: {}", SCHEMA_DEBUG_KEY, e);
    }

    let response: Value = serde_json::from_str(&body)?;
    let schema = parse_schema(&response, &options.prefix)?;
    log::info!("Parsed {} entity definitions", schema.len());

    if !schema.is_empty() {
        match schema.to_json() {
            Ok(json) => {
                if let Err(e) = store.put(SCHEMA_CACHE_KEY, &json) {
                    log::warn!("Failed to write {}: {}", SCHEMA_CACHE_KEY, e);
                }
            }
            Err(e) => log::warn!("Failed to serialize schema cache: {}", e),
        }
    }

    Ok(schema)
}

fn read_cached<S: CacheStore + ?Sized>(store: &S) -> Result<Option<SchemaCache>, DataverseError> {
    match store.get(SCHEMA_CACHE_KEY)? {
        Some(json) => Ok(Some(SchemaCache::from_json(&json)?)),
        None => Ok(None),
    }
}

/// Build a schema cache from an `EntityDefinitions` list response, keeping
/// entities whose logical name starts with `prefix`.
///
/// Entities that cannot be parsed are logged and skipped.
pub fn parse_schema(response: &Value, prefix: &str) -> Result<SchemaCache, DataverseError> {
    let definitions = response
        .get("value")
        .and_then(|value| value.as_array())
        .ok_or_else(|| DataverseError::SchemaParse {
            entity: "EntityDefinitions".to_string(),
            message: "Invalid response from Dataverse".to_string(),
        })?;

    let mut schema = SchemaCache::new();

    for raw in definitions {
        let logical_name = raw
            .get("LogicalName")
            .and_then(|name| name.as_str())
            .unwrap_or_default();
        if !logical_name.starts_with(prefix) {
            continue;
        }

        let entity = match parse_entity(raw) {
            Ok(Some(entity)) => entity,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping entity: {}", e);
                continue;
            }
        };

        let display_name = entity.display_name.clone();
        if !schema.insert(entity) {
            log::warn!(
                "Skipping {}: display name '{}' is already taken",
                logical_name,
                display_name
            );
        }
    }

    Ok(schema)
}

/// Parse one entity. `Ok(None)` means the entity has no display label.
fn parse_entity(raw: &Value) -> Result<Option<EntitySchema>, DataverseError> {
    let logical_name = raw
        .get("LogicalName")
        .and_then(|name| name.as_str())
        .unwrap_or_default()
        .to_string();

    let definition: EntityDefinition =
        serde_json::from_value(raw.clone()).map_err(|e| DataverseError::SchemaParse {
            entity: logical_name.clone(),
            message: e.to_string(),
        })?;

    let display_name = definition.label();
    if display_name.is_empty() {
        return Ok(None);
    }

    let key_column = definition
        .primary_name_attribute
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DataverseError::SchemaParse {
            entity: logical_name.clone(),
            message: "missing PrimaryNameAttribute".to_string(),
        })?;

    Ok(Some(EntitySchema {
        display_name,
        logical_name: definition.logical_name,
        key_column,
        entity_set_name: definition.entity_set_name,
        columns: parse_attributes(&logical_name, &definition.attributes),
    }))
}

/// Columns keyed by display label. Unlabelled or duplicate-labelled columns
/// are keyed by logical name so they stay unique and reachable.
fn parse_attributes(entity: &str, attributes: &[EntityAttribute]) -> BTreeMap<String, ColumnSchema> {
    let mut columns = BTreeMap::new();

    for attribute in attributes {
        if attribute.is_sub_attribute() {
            continue;
        }

        let label = attribute.label();
        let display_name = if label.is_empty() || columns.contains_key(&label) {
            if !label.is_empty() {
                log::debug!(
                    "{}: label '{}' already used, keying {} by logical name",
                    entity,
                    label,
                    attribute.logical_name
                );
            }
            attribute.logical_name.clone()
        } else {
            label
        };

        let column = ColumnSchema {
            display_name: display_name.clone(),
            logical_name: attribute.logical_name.clone(),
            schema_name: attribute.schema_name.clone(),
            attribute_type: attribute
                .attribute_type
                .clone()
                .unwrap_or_default()
                .into(),
            related: attribute
                .targets
                .as_ref()
                .and_then(|targets| targets.first().cloned()),
        };

        columns.entry(display_name).or_insert(column);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataverse::schema::AttributeType;
    use crate::dataverse::store::MemoryCacheStore;
    use crate::dataverse::testing::{sample_schema, FakeTransport};
    use crate::dataverse::transport::HttpResponse;
    use chrono::Utc;
    use serde_json::json;

    fn label(text: &str) -> Value {
        json!({ "UserLocalizedLabel": { "Label": text } })
    }

    fn metadata_response() -> Value {
        json!({
            "value": [
                {
                    "LogicalName": "account",
                    "EntitySetName": "accounts",
                    "PrimaryNameAttribute": "name",
                    "DisplayName": label("Account"),
                    "Attributes": []
                },
                {
                    "LogicalName": "able_location",
                    "EntitySetName": "able_locations",
                    "PrimaryNameAttribute": "able_name",
                    "DisplayName": label("Location"),
                    "Attributes": [
                        {
                            "LogicalName": "able_state",
                            "SchemaName": "able_State",
                            "AttributeType": "Lookup",
                            "DisplayName": label("State"),
                            "Targets": ["able_state"]
                        },
                        {
                            "LogicalName": "able_statename",
                            "SchemaName": "able_StateName",
                            "AttributeType": "String",
                            "AttributeOf": "able_state",
                            "DisplayName": label("State")
                        },
                        {
                            "LogicalName": "statecode",
                            "SchemaName": "statecode",
                            "AttributeType": "State",
                            "DisplayName": label("Status")
                        },
                        {
                            "LogicalName": "able_legacycode",
                            "SchemaName": "able_LegacyCode",
                            "AttributeType": "String",
                            "DisplayName": { "UserLocalizedLabel": null }
                        }
                    ]
                },
                {
                    "LogicalName": "able_state",
                    "EntitySetName": "able_states",
                    "PrimaryNameAttribute": "able_name",
                    "DisplayName": label("States"),
                    "Attributes": [
                        {
                            "LogicalName": "able_name",
                            "SchemaName": "able_Name",
                            "AttributeType": "String",
                            "DisplayName": label("Name")
                        }
                    ]
                },
                {
                    "LogicalName": "able_hidden",
                    "EntitySetName": "able_hiddens",
                    "PrimaryNameAttribute": "able_name",
                    "DisplayName": { "UserLocalizedLabel": null },
                    "Attributes": []
                },
                {
                    "LogicalName": "able_broken",
                    "DisplayName": label("Broken"),
                    "Attributes": []
                },
                {
                    "LogicalName": "able_nokey",
                    "EntitySetName": "able_nokeys",
                    "PrimaryNameAttribute": null,
                    "DisplayName": label("No Key"),
                    "Attributes": []
                }
            ]
        })
    }

    #[test]
    fn parses_prefixed_entities_and_skips_bad_ones() {
        let schema = parse_schema(&metadata_response(), "able_").unwrap();

        let names: Vec<&str> = schema
            .entities()
            .map(|entity| entity.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Location", "States"]);

        let location = schema.get("Location").unwrap();
        assert_eq!(location.key_column, "able_name");
        assert_eq!(location.entity_set_name, "able_locations");
        assert_eq!(location.columns.len(), 3);

        let state = &location.columns["State"];
        assert_eq!(state.logical_name, "able_state");
        assert_eq!(state.attribute_type, AttributeType::Lookup);
        assert_eq!(state.related.as_deref(), Some("able_state"));

        let legacy = location.resolve_column("able_legacycode").unwrap();
        assert_eq!(legacy.display_name, "able_legacycode");
    }

    #[test]
    fn malformed_response_is_an_error() {
        assert!(parse_schema(&json!({ "error": "nope" }), "able_").is_err());
    }

    #[tokio::test]
    async fn fresh_cache_makes_no_network_calls() {
        let store = MemoryCacheStore::new();
        store
            .put(SCHEMA_CACHE_KEY, &sample_schema().to_json().unwrap())
            .unwrap();
        let transport = FakeTransport::new();

        let schema = load_schema(&transport, &store, &SchemaOptions::default())
            .await
            .unwrap();

        assert_eq!(schema, sample_schema());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_cache_fetches_once_and_persists() {
        let store = MemoryCacheStore::new();
        store.insert_at(
            SCHEMA_CACHE_KEY,
            &sample_schema().to_json().unwrap(),
            Utc::now() - Duration::hours(2),
        );
        let transport = FakeTransport::new()
            .on_get(Ok(HttpResponse::new(200, metadata_response().to_string())));

        let schema = load_schema(&transport, &store, &SchemaOptions::default())
            .await
            .unwrap();

        assert_eq!(transport.count("GET"), 1);
        let calls = transport.calls();
        assert!(calls[0]
            .uri
            .ends_with("/api/data/v9.2/EntityDefinitions?$expand=Attributes%2COneToManyRelationships"));
        assert_eq!(schema.len(), 2);
        assert!(store.is_fresh(SCHEMA_CACHE_KEY, Duration::hours(1)));
        assert!(store.contains(SCHEMA_DEBUG_KEY));

        let persisted = SchemaCache::from_json(&store.get(SCHEMA_CACHE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, schema);
    }

    #[tokio::test]
    async fn missing_cache_fetches_once() {
        let store = MemoryCacheStore::new();
        let transport = FakeTransport::new()
            .on_get(Ok(HttpResponse::new(200, metadata_response().to_string())));

        load_schema(&transport, &store, &SchemaOptions::default())
            .await
            .unwrap();
        assert_eq!(transport.count("GET"), 1);
    }

    /// Reads nothing back and refuses every write.
    struct ReadOnlyStore;

    impl CacheStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, DataverseError> {
            Ok(None)
        }

        fn put(&self, _key: &str, _contents: &str) -> Result<(), DataverseError> {
            Err(DataverseError::Cache("disk full".to_string()))
        }

        fn modified(&self, _key: &str) -> Option<chrono::DateTime<Utc>> {
            None
        }
    }

    #[tokio::test]
    async fn schema_is_usable_when_persisting_fails() {
        let transport = FakeTransport::new()
            .on_get(Ok(HttpResponse::new(200, metadata_response().to_string())));

        let schema = load_schema(&transport, &ReadOnlyStore, &SchemaOptions::default())
            .await
            .unwrap();

        assert_eq!(transport.count("GET"), 1);
        assert_eq!(schema.len(), 2);
        assert!(schema.resolve_entity("Location").is_ok());
    }

    #[tokio::test]
    async fn unreadable_fresh_cache_fetches_once() {
        let store = MemoryCacheStore::new();
        store.put(SCHEMA_CACHE_KEY, "{ not json").unwrap();
        let transport = FakeTransport::new()
            .on_get(Ok(HttpResponse::new(200, metadata_response().to_string())));

        let schema = load_schema(&transport, &store, &SchemaOptions::default())
            .await
            .unwrap();

        assert_eq!(transport.count("GET"), 1);
        assert_eq!(schema.len(), 2);
        let repaired = SchemaCache::from_json(&store.get(SCHEMA_CACHE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(repaired, schema);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let store = MemoryCacheStore::new();
        let transport = FakeTransport::new().on_get(Ok(HttpResponse::new(
            401,
            r#"{"error":{"message":"Unauthorized"}}"#,
        )));

        let err = load_schema(&transport, &store, &SchemaOptions::default())
            .await
            .unwrap_err();
        match err {
            DataverseError::Http { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!store.contains(SCHEMA_CACHE_KEY));
    }
}
