//! Persistence seam
//!
//! Models never talk to a driver directly; they go through [`DocumentStore`].
//! [`MemoryStore`] is the in-process implementation used for development and
//! tests. A network driver implements the same trait.

pub mod filter;
mod memory;

pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use bson::{oid::ObjectId, Document};

/// Sort, skip and limit for a find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// `{field: 1}` ascending, `{field: -1}` descending, applied in key order
    pub sort: Document,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, sort: Document) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Streaming result of a find
#[async_trait]
pub trait Cursor: Send {
    /// Next document, or `None` when exhausted
    async fn next(&mut self) -> Result<Option<Document>>;

    /// Release server-side resources
    async fn close(&mut self) -> Result<()>;
}

/// Drain a cursor, closing it whether or not iteration failed
pub async fn collect_cursor(cursor: &mut dyn Cursor) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    let drained = loop {
        match cursor.next().await {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = cursor.close().await;
    drained?;
    closed?;
    Ok(documents)
}

/// Document store operations a model needs
///
/// Update documents use the `{"$set": {...}}` form.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Option<Document>>;

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Box<dyn Cursor>>;

    /// Insert and return the document's `_id` (generated when missing)
    async fn insert_one(&self, collection: &str, document: Document) -> Result<ObjectId>;

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult>;

    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult>;

    async fn delete_one(&self, collection: &str, filter: &Document) -> Result<DeleteResult>;

    async fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult>;

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64>;

    /// Request an index on `field`; returns the index name
    async fn create_index(&self, collection: &str, field: &str, unique: bool) -> Result<String>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Cursor over documents already materialized in memory
pub struct VecCursor {
    documents: std::vec::IntoIter<Document>,
    closed: bool,
}

impl VecCursor {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents: documents.into_iter(), closed: false }
    }
}

#[async_trait]
impl Cursor for VecCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        if self.closed {
            anyhow::bail!("cursor is closed");
        }
        Ok(self.documents.next())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn test_collect_cursor() {
        let mut cursor = VecCursor::new(vec![doc! { "a": 1 }, doc! { "a": 2 }]);
        let documents = collect_cursor(&mut cursor).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert!(cursor.next().await.is_err());
    }

    #[test]
    fn test_find_options_builder() {
        let options = FindOptions::new().with_sort(doc! { "age": -1 }).with_skip(5).with_limit(10);
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.sort.get_i32("age").ok(), Some(-1));
    }
}
