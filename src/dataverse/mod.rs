/// Display-name driven record creation.
pub mod bulkload;
/// Attribute metadata as returned by the Web API.
pub mod entityattribute;
/// Entity metadata as returned by the Web API.
pub mod entitydefinition;
/// Schema cache loading.
pub mod metadata;
/// Row to payload compilation.
pub mod payload;
/// Name resolution over the schema cache.
pub mod resolver;
/// Parsed entity and column schema.
pub mod schema;
/// HTTP client for the Web API.
pub mod serviceclient;
/// Cache storage backends.
pub mod store;
/// CSV input.
pub mod tabular;
/// Transport abstraction and URI helpers.
pub mod transport;
/// Sequential record upload.
pub mod uploader;

#[cfg(test)]
pub(crate) mod testing;
