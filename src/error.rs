use thiserror::Error;

/// Errors raised while loading schema metadata, compiling payloads or talking
/// to the Dataverse Web API.
///
/// Per-row upload failures are never returned through this type; they are
/// recorded in the upload report instead.
#[derive(Error, Debug)]
pub enum DataverseError {
    /// Token acquisition failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request could not be sent or the response could not be read.
    #[error("Request failed: {0}")]
    Request(String),

    /// The API answered with an unexpected status.
    #[error("Dataverse API error ({status}): {message}")]
    Http { status: u16, message: String },

    /// A single entity definition could not be parsed.
    #[error("Unable to parse entity definition '{entity}': {message}")]
    SchemaParse { entity: String, message: String },

    /// No entity matches the display or logical name.
    #[error("Entity '{name}' not found in schema cache")]
    EntityNotFound { name: String },

    /// No column of the entity matches the display or logical name.
    #[error("Column '{column}' not found in entity '{entity}'")]
    ColumnNotFound { column: String, entity: String },

    /// A reference column without a related entity in its metadata.
    #[error("Lookup column '{column}' in entity '{entity}' has no related entity")]
    MissingLookupTarget { column: String, entity: String },

    /// Two fields of one row resolve to the same column.
    #[error("Fields '{first}' and '{second}' both map to column '{column}' in entity '{entity}'")]
    DuplicateColumn {
        column: String,
        entity: String,
        first: String,
        second: String,
    },

    /// A lookup value cannot be written as a key of the related entity.
    #[error("Value {value} is not a valid key for '{key_column}' on '{entity}': {message}")]
    InvalidLookupKey {
        entity: String,
        key_column: String,
        value: String,
        message: String,
    },

    /// Cache storage failure other than plain I/O.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The connection settings are missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a response or cache entry.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Unreadable CSV input.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl DataverseError {
    /// True for errors caused by a display or logical name that does not
    /// resolve against the schema cache.
    pub fn is_name_resolution(&self) -> bool {
        matches!(
            self,
            DataverseError::EntityNotFound { .. }
                | DataverseError::ColumnNotFound { .. }
                | DataverseError::MissingLookupTarget { .. }
        )
    }
}
