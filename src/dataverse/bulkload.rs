use std::path::Path;

use crate::dataverse::metadata::{load_schema, SchemaOptions};
use crate::dataverse::payload::{PayloadCompiler, Row};
use crate::dataverse::schema::SchemaCache;
use crate::dataverse::store::CacheStore;
use crate::dataverse::tabular::read_csv;
use crate::dataverse::transport::Transport;
use crate::dataverse::uploader::{upload, UploadReport};
use crate::error::DataverseError;

/// Creates records in entities addressed by display name.
pub struct BulkLoader<T> {
    transport: T,
    schema: SchemaCache,
}

impl<T: Transport> BulkLoader<T> {
    /// Load (or reuse the cached) schema and wrap `transport`.
    pub async fn connect<S: CacheStore + ?Sized>(
        transport: T,
        store: &S,
        options: &SchemaOptions,
    ) -> Result<Self, DataverseError> {
        let schema = load_schema(&transport, store, options).await?;
        Ok(Self::with_schema(transport, schema))
    }

    pub fn with_schema(transport: T, schema: SchemaCache) -> Self {
        Self { transport, schema }
    }

    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Compile every row for `entity_name` and create the records.
    ///
    /// A row that does not compile aborts the whole call before anything is
    /// sent; upload failures are reported per row.
    pub async fn create(
        &self,
        entity_name: &str,
        rows: &[Row],
    ) -> Result<UploadReport, DataverseError> {
        let entity = self.schema.resolve_entity(entity_name)?;
        let payloads = PayloadCompiler::new(&self.schema).compile_all(entity, rows)?;

        log::info!(
            "Creating {} {} records in {}",
            payloads.len(),
            entity.display_name,
            entity.entity_set_name
        );

        Ok(upload(&self.transport, &entity.entity_set_name, payloads).await)
    }

    /// Read `path` as CSV and create one record per line.
    pub async fn create_from_csv(
        &self,
        entity_name: &str,
        path: &Path,
    ) -> Result<UploadReport, DataverseError> {
        let rows = read_csv(path)?;
        self.create(entity_name, &rows).await
    }
}
