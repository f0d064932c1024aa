//! Models: a schema bound to one collection of a document store
//!
//! [`Model`] works with generic documents; [`TypedModel`] wraps it for a
//! concrete record type and is what most applications use.

mod query;
mod revalidate;
mod typed;

pub use revalidate::UpdatePayload;
pub use typed::TypedModel;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result, Rule, ValidationErrors};
use crate::introspect::is_zero;
use crate::model_inspect::FieldAccess;
use crate::schema::{Schema, SAVE_EVENT};
use crate::store::{collect_cursor, DocumentStore, FindOptions};
use bson::{doc, oid::ObjectId, Bson, Document};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default time allowed for each index creation request
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const UPDATED_AT: &str = "updatedAt";

/// Construction options for [`Model`]
#[derive(Clone)]
pub struct ModelOptions {
    pub clock: Arc<dyn Clock>,
    pub index_timeout: Duration,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self { clock: Arc::new(SystemClock), index_timeout: DEFAULT_INDEX_TIMEOUT }
    }
}

impl ModelOptions {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }
}

/// A schema bound to a collection
#[derive(Clone)]
pub struct Model {
    name: String,
    collection_name: String,
    schema: Schema,
    store: Option<Arc<dyn DocumentStore>>,
    clock: Arc<dyn Clock>,
}

impl Model {
    /// Bind `schema` to a collection and request its indexes
    ///
    /// The collection is the schema's collection override, or `name`. Without
    /// a store every data operation fails with [`Error::NilCollection`].
    /// Index creation failures are logged, not returned.
    pub async fn new(
        name: impl Into<String>,
        schema: Schema,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self> {
        Self::with_options(name, schema, store, ModelOptions::default()).await
    }

    pub async fn with_options(
        name: impl Into<String>,
        schema: Schema,
        store: Option<Arc<dyn DocumentStore>>,
        options: ModelOptions,
    ) -> Result<Self> {
        schema.verify()?;

        let name = name.into();
        let collection_name = schema.collection().map(str::to_string).unwrap_or_else(|| name.clone());
        let model = Self { name, collection_name, schema, store, clock: options.clock };

        model.ensure_indexes(options.index_timeout).await;
        Ok(model)
    }

    async fn ensure_indexes(&self, timeout: Duration) {
        let Some(store) = &self.store else {
            return;
        };

        for (field, constraint) in self.schema.fields() {
            if !(constraint.index || constraint.unique) {
                continue;
            }
            let kind = if constraint.unique { "unique index" } else { "index" };
            let request = store.create_index(&self.collection_name, field, constraint.unique);
            match tokio::time::timeout(timeout, request).await {
                Ok(Ok(_)) => log::info!("Created {} for field '{}'", kind, field),
                Ok(Err(e)) => log::warn!("Failed to create {} for field '{}': {}", kind, field, e),
                Err(_) => log::warn!(
                    "Timed out creating {} for field '{}' after {:?}",
                    kind,
                    field,
                    timeout
                ),
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Adjust constraints after construction; indexes are not re-requested
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn store(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.store.as_ref().ok_or(Error::NilCollection)
    }

    fn run_middlewares(&self, event: &str, document: &mut dyn FieldAccess) -> Result<()> {
        for middleware in self.schema.middlewares(event) {
            middleware(&mut *document).map_err(|e| Error::Middleware(e.to_string()))?;
        }
        Ok(())
    }

    /// Fill fields that are absent or zero with their declared default
    fn apply_defaults(&self, document: &mut dyn FieldAccess) -> Result<()> {
        for (name, constraint) in self.schema.fields() {
            let Some(default) = &constraint.default else {
                continue;
            };
            if document.get_field_value(name).is_some_and(|v| !is_zero(&v)) {
                continue;
            }
            document.set_field_value(name, default.clone()).map_err(|e| {
                Error::Validation(ValidationErrors::single(
                    Some(name.clone()),
                    Rule::Type,
                    format!("cannot apply default to field '{}': {}", name, e),
                ))
            })?;
        }
        Ok(())
    }

    fn stamp_instance(document: &mut dyn FieldAccess, field: &str, now: bson::DateTime) {
        if document.has_field(field) {
            if let Err(e) = document.set_field_value(field, Bson::DateTime(now)) {
                log::debug!("Could not set '{}' on document: {}", field, e);
            }
        }
    }

    /// Insert a new document
    ///
    /// Runs save middlewares, applies defaults, validates, stamps
    /// `createdAt`/`updatedAt` when timestamps are enabled, then inserts.
    /// The generated id is written back when the document has an `_id` field.
    pub async fn create<D>(&self, document: &mut D) -> Result<ObjectId>
    where
        D: FieldAccess + Serialize + Send,
    {
        let store = self.store()?;

        self.run_middlewares(SAVE_EVENT, document)?;
        self.apply_defaults(document)?;
        self.schema.validate_document(&*document).map_err(|e| {
            log::warn!("Document validation failed for {}: {}", self.name, e);
            e
        })?;

        let now = self.schema.timestamps().then(|| self.clock.now_bson());
        if let Some(now) = now {
            Self::stamp_instance(document, CREATED_AT, now);
            Self::stamp_instance(document, UPDATED_AT, now);
        }

        let mut record = bson::to_document(&*document)
            .map_err(|e| Error::Decode(format!("failed to encode document: {}", e)))?;
        if let Some(now) = now {
            record.insert(CREATED_AT, now);
            record.insert(UPDATED_AT, now);
        }
        if record.get("_id").is_some_and(is_zero) {
            record.remove("_id");
        }

        let id = store.insert_one(&self.collection_name, record).await.map_err(|e| {
            log::warn!("Failed to insert document: {}", e);
            Error::Database(format!("failed to create document: {}", e))
        })?;

        if document.has_field("_id") {
            if let Err(e) = document.set_field_value("_id", Bson::ObjectId(id)) {
                log::debug!("Could not set generated id on document: {}", e);
            }
        }

        Ok(id)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Document> {
        let store = self.store()?;
        let object_id = parse_object_id(id)?;

        store
            .find_one(&self.collection_name, &doc! { "_id": object_id }, &FindOptions::default())
            .await
            .map_err(|e| {
                log::warn!("Failed to retrieve document with ID {}: {}", id, e);
                Error::Database(format!("failed to retrieve document: {}", e))
            })?
            .ok_or_else(|| {
                log::warn!("Document not found with ID: {}", id);
                Error::NotFound(id.to_string())
            })
    }

    pub async fn find_one(&self, filter: Document) -> Result<Document> {
        self.find_one_with_options(filter, &FindOptions::default()).await
    }

    pub(crate) async fn find_one_with_options(
        &self,
        filter: Document,
        options: &FindOptions,
    ) -> Result<Document> {
        let store = self.store()?;
        store
            .find_one(&self.collection_name, &filter, options)
            .await
            .map_err(|e| {
                log::warn!("Failed to retrieve document: {}", e);
                Error::Database(format!("failed to retrieve document: {}", e))
            })?
            .ok_or_else(|| {
                log::warn!("Document not found with filter: {}", filter);
                Error::NotFound(format!("no document matches {}", filter))
            })
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Document>> {
        self.find_with_options(filter, &FindOptions::default()).await
    }

    pub(crate) async fn find_with_options(
        &self,
        filter: Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let store = self.store()?;
        let mut cursor = store.find(&self.collection_name, &filter, options).await.map_err(|e| {
            log::warn!("Failed to retrieve documents: {}", e);
            Error::Database(format!("failed to retrieve documents: {}", e))
        })?;
        collect_cursor(cursor.as_mut()).await.map_err(|e| {
            log::warn!("Error during cursor iteration: {}", e);
            Error::Database(format!("error during cursor iteration: {}", e))
        })
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let store = self.store()?;
        let object_id = parse_object_id(id)?;

        let result =
            store.delete_one(&self.collection_name, &doc! { "_id": object_id }).await.map_err(|e| {
                log::warn!("Failed to delete document with ID {}: {}", id, e);
                Error::Database(format!("failed to delete document: {}", e))
            })?;

        if result.deleted_count == 0 {
            log::warn!("Document not found with ID: {}", id);
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        let store = self.store()?;
        store.count(&self.collection_name, &filter).await.map_err(|e| {
            log::warn!("Failed to count documents: {}", e);
            Error::Database(format!("failed to count documents: {}", e))
        })
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("collection_name", &self.collection_name)
            .field("schema", &self.schema)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

pub(crate) fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| {
        log::warn!("Invalid ObjectId format: {} - {}", id, e);
        Error::InvalidId(e.to_string())
    })
}
