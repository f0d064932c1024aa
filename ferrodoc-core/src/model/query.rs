//! Query-builder variants of the model operations

use super::Model;
use crate::error::{Error, Result};
use crate::query::Builder;
use bson::Document;

impl Model {
    pub async fn find_with_query(&self, query: &Builder) -> Result<Vec<Document>> {
        self.store()?;
        let (filter, options) = built(query)?;
        self.find_with_options(filter, &options).await
    }

    pub async fn find_one_with_query(&self, query: &Builder) -> Result<Document> {
        self.store()?;
        let (filter, options) = built(query)?;
        self.find_one_with_options(filter, &options).await
    }

    pub async fn count_with_query(&self, query: &Builder) -> Result<u64> {
        self.store()?;
        let (filter, _) = built(query)?;
        self.count(filter).await
    }

    /// Delete every matching document; returns the deleted count
    pub async fn delete_with_query(&self, query: &Builder) -> Result<u64> {
        let store = self.store()?;
        let (filter, _) = built(query)?;
        let result = store.delete_many(self.collection_name(), &filter).await.map_err(|e| {
            log::warn!("Failed to delete documents with query: {}", e);
            Error::Database(format!("failed to delete documents: {}", e))
        })?;
        Ok(result.deleted_count)
    }
}

fn built(query: &Builder) -> Result<(Document, crate::store::FindOptions)> {
    query.build().map_err(|e| {
        log::warn!("Failed to build query: {}", e);
        e
    })
}
