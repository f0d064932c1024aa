use super::{Model, ModelOptions, UpdatePayload};
use crate::error::{Error, Result};
use crate::model_inspect::Record;
use crate::query::Builder;
use crate::schema::{Schema, TypeWitness};
use crate::store::DocumentStore;
use bson::{oid::ObjectId, Document};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Model operations typed to one record
///
/// Constructing a `TypedModel<T>` records `T` as the schema's type witness,
/// which turns on full revalidation of partial updates.
pub struct TypedModel<T: Record> {
    model: Model,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for TypedModel<T> {
    fn clone(&self) -> Self {
        Self { model: self.model.clone(), _record: PhantomData }
    }
}

impl<T: Record> std::fmt::Debug for TypedModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedModel").field("model", &self.model).finish()
    }
}

impl<T: Record> TypedModel<T> {
    pub async fn new(
        name: impl Into<String>,
        schema: Schema,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self> {
        Self::with_options(name, schema, store, ModelOptions::default()).await
    }

    pub async fn with_options(
        name: impl Into<String>,
        mut schema: Schema,
        store: Option<Arc<dyn DocumentStore>>,
        options: ModelOptions,
    ) -> Result<Self> {
        schema.set_witness(TypeWitness::of::<T>());
        let model = Model::with_options(name, schema, store, options).await?;
        Ok(Self { model, _record: PhantomData })
    }

    /// The untyped model underneath
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn decode(document: Document) -> Result<T> {
        bson::from_document(document).map_err(|e| {
            log::warn!("Failed to decode document: {}", e);
            Error::Decode(e.to_string())
        })
    }

    fn decode_all(documents: Vec<Document>) -> Result<Vec<T>> {
        documents.into_iter().map(Self::decode).collect()
    }

    pub async fn create(&self, record: &mut T) -> Result<ObjectId> {
        self.model.create(record).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<T> {
        Self::decode(self.model.find_by_id(id).await?)
    }

    pub async fn find_one(&self, filter: Document) -> Result<T> {
        Self::decode(self.model.find_one(filter).await?)
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<T>> {
        Self::decode_all(self.model.find(filter).await?)
    }

    pub async fn update_by_id(&self, id: &str, update: impl Into<UpdatePayload>) -> Result<()> {
        self.model.update_by_id(id, update).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.model.delete_by_id(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.model.count(filter).await
    }

    pub async fn find_with_query(&self, query: &Builder) -> Result<Vec<T>> {
        Self::decode_all(self.model.find_with_query(query).await?)
    }

    pub async fn find_one_with_query(&self, query: &Builder) -> Result<T> {
        Self::decode(self.model.find_one_with_query(query).await?)
    }

    pub async fn count_with_query(&self, query: &Builder) -> Result<u64> {
        self.model.count_with_query(query).await
    }

    pub async fn update_with_query(
        &self,
        query: &Builder,
        update: impl Into<UpdatePayload>,
    ) -> Result<u64> {
        self.model.update_with_query(query, update).await
    }

    pub async fn delete_with_query(&self, query: &Builder) -> Result<u64> {
        self.model.delete_with_query(query).await
    }
}

impl<T: Record> Deref for TypedModel<T> {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}
