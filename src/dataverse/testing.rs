//! Shared fixtures for unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::dataverse::schema::{AttributeType, ColumnSchema, EntitySchema, SchemaCache};
use crate::dataverse::transport::{HttpResponse, Transport};
use crate::error::DataverseError;

pub const BASE_URL: &str = "https://org.crm.dynamics.com";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub uri: String,
    pub body: Option<Value>,
}

/// Scripted transport. Queued responses are handed out in order; an empty
/// GET queue answers 404 and an empty POST queue answers 201 echoing the body.
#[derive(Default)]
pub struct FakeTransport {
    gets: Mutex<VecDeque<Result<HttpResponse, DataverseError>>>,
    posts: Mutex<VecDeque<Result<HttpResponse, DataverseError>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, response: Result<HttpResponse, DataverseError>) -> Self {
        self.gets.lock().unwrap().push_back(response);
        self
    }

    pub fn on_post(self, response: Result<HttpResponse, DataverseError>) -> Self {
        self.posts.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|call| call.method == method).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get(&self, uri: &str) -> Result<HttpResponse, DataverseError> {
        self.calls.lock().unwrap().push(Call {
            method: "GET",
            uri: uri.to_string(),
            body: None,
        });
        self.gets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "")))
    }

    async fn post(&self, uri: &str, body: &Value) -> Result<HttpResponse, DataverseError> {
        self.calls.lock().unwrap().push(Call {
            method: "POST",
            uri: uri.to_string(),
            body: Some(body.clone()),
        });
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(201, body.to_string())))
    }
}

fn column(
    display_name: &str,
    logical_name: &str,
    schema_name: &str,
    attribute_type: AttributeType,
    related: Option<&str>,
) -> (String, ColumnSchema) {
    (
        display_name.to_string(),
        ColumnSchema {
            display_name: display_name.to_string(),
            logical_name: logical_name.to_string(),
            schema_name: schema_name.to_string(),
            attribute_type,
            related: related.map(|name| name.to_string()),
        },
    )
}

fn entity(
    display_name: &str,
    logical_name: &str,
    key_column: &str,
    entity_set_name: &str,
    columns: Vec<(String, ColumnSchema)>,
) -> EntitySchema {
    EntitySchema {
        display_name: display_name.to_string(),
        logical_name: logical_name.to_string(),
        key_column: key_column.to_string(),
        entity_set_name: entity_set_name.to_string(),
        columns: columns.into_iter().collect::<BTreeMap<_, _>>(),
    }
}

/// A small survey-tracking schema: locations referencing states, surveys
/// (numeric key) and sites (GUID key).
pub fn sample_schema() -> SchemaCache {
    let mut schema = SchemaCache::new();

    schema.insert(entity(
        "States",
        "able_state",
        "able_name",
        "able_states",
        vec![column("Name", "able_name", "able_Name", AttributeType::String, None)],
    ));

    schema.insert(entity(
        "Survey",
        "able_survey",
        "able_surveynumber",
        "able_surveys",
        vec![column(
            "Survey Number",
            "able_surveynumber",
            "able_SurveyNumber",
            AttributeType::Integer,
            None,
        )],
    ));

    schema.insert(entity(
        "Site",
        "able_site",
        "able_siteid",
        "able_sites",
        vec![column(
            "Site",
            "able_siteid",
            "able_SiteId",
            AttributeType::Uniqueidentifier,
            None,
        )],
    ));

    schema.insert(entity(
        "Location",
        "able_location",
        "able_name",
        "able_locations",
        vec![
            column("AU", "able_au", "able_au", AttributeType::String, None),
            column(
                "Description",
                "able_description",
                "able_description",
                AttributeType::Memo,
                None,
            ),
            column(
                "State",
                "able_state",
                "able_State",
                AttributeType::Lookup,
                Some("States"),
            ),
            column("Status", "statecode", "statecode", AttributeType::State, None),
            column(
                "Survey",
                "able_survey",
                "able_Survey",
                AttributeType::Lookup,
                Some("able_survey"),
            ),
            column(
                "Site",
                "able_site",
                "able_Site",
                AttributeType::Lookup,
                Some("able_site"),
            ),
            column(
                "Region",
                "able_region",
                "able_Region",
                AttributeType::Lookup,
                None,
            ),
            column(
                "Manager",
                "able_manager",
                "able_Manager",
                AttributeType::Lookup,
                Some("contact"),
            ),
        ],
    ));

    schema
}
