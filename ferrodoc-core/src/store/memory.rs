//! In-memory document storage
//!
//! Collections live in a `HashMap` behind an async `RwLock`. Data is lost on
//! drop. Suitable for development and tests.

use super::filter::{lookup, matches, sort_order};
use super::{Cursor, DeleteResult, DocumentStore, FindOptions, UpdateResult, VecCursor};
use crate::introspect::{as_i64, values_equal};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    /// field -> unique
    indexes: BTreeMap<String, bool>,
}

impl Collection {
    /// First unique index `candidate` would violate, ignoring position `skip`
    ///
    /// Positions present in `staged` are compared by their staged version.
    fn unique_conflict(
        &self,
        candidate: &Document,
        skip: Option<usize>,
        staged: &BTreeMap<usize, Document>,
    ) -> Option<String> {
        let others = || {
            self.documents
                .iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != skip)
                .map(move |(i, document)| staged.get(&i).unwrap_or(document))
        };

        if candidate.get("_id").is_some() && others().any(|other| other.get("_id") == candidate.get("_id")) {
            return Some("_id".to_string());
        }

        for (field, unique) in &self.indexes {
            if !unique {
                continue;
            }
            let value = match lookup(candidate, field) {
                Some(Bson::Null) | None => continue,
                Some(value) => value,
            };
            if others().any(|other| lookup(other, field).is_some_and(|o| values_equal(o, value))) {
                return Some(field.clone());
            }
        }
        None
    }

    fn matching(&self, filter: &Document) -> Result<Vec<usize>> {
        let mut positions = Vec::new();
        for (i, document) in self.documents.iter().enumerate() {
            if matches(document, filter)? {
                positions.push(i);
            }
        }
        Ok(positions)
    }
}

/// In-memory document store
///
/// Cloning shares the underlying collections.
///
/// # Example
///
/// ```
/// use ferrodoc_core::store::MemoryStore;
///
/// let store = MemoryStore::new();
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in `collection`
    pub async fn document_count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, |c| c.documents.len())
    }

    /// Indexes created on `collection`, as `(field, unique)` pairs
    pub async fn indexes(&self, collection: &str) -> Vec<(String, bool)> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|(f, u)| (f.clone(), *u)).collect())
            .unwrap_or_default()
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> Result<UpdateResult> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };

        let mut positions = coll.matching(filter)?;
        if !multi {
            positions.truncate(1);
        }

        // Nothing is written until every changed document passed the unique checks
        let mut staged = BTreeMap::new();
        for &i in &positions {
            let mut updated = coll.documents[i].clone();
            if apply_update(&mut updated, update)? {
                if let Some(field) = coll.unique_conflict(&updated, Some(i), &staged) {
                    bail!("E11000 duplicate key error collection: {} index: {}", collection, field);
                }
                staged.insert(i, updated);
            }
        }

        let modified_count = staged.len() as u64;
        for (i, document) in staged {
            coll.documents[i] = document;
        }

        Ok(UpdateResult { matched_count: positions.len() as u64, modified_count })
    }

    async fn delete(&self, collection: &str, filter: &Document, multi: bool) -> Result<DeleteResult> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };

        let mut positions = coll.matching(filter)?;
        if !multi {
            positions.truncate(1);
        }
        for &i in positions.iter().rev() {
            coll.documents.remove(i);
        }
        Ok(DeleteResult { deleted_count: positions.len() as u64 })
    }
}

/// Apply a `{"$set": {...}}` update; returns whether anything changed
fn apply_update(document: &mut Document, update: &Document) -> Result<bool> {
    let mut changed = false;
    for (op, arg) in update {
        match op.as_str() {
            "$set" => {
                let fields = arg.as_document().ok_or_else(|| anyhow!("$set expects a document"))?;
                for (path, value) in fields {
                    changed |= set_path(document, path, value.clone())?;
                }
            }
            other if other.starts_with('$') => bail!("unsupported update operator {}", other),
            _ => bail!("update document must only contain operators, found '{}'", op),
        }
    }
    Ok(changed)
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> Result<bool> {
    match path.split_once('.') {
        None => {
            let changed = document.get(path) != Some(&value);
            document.insert(path, value);
            Ok(changed)
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => bail!("cannot set '{}': '{}' is not a document", path, head),
            }
        }
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    if sort.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let ordering = sort_order(lookup(a, field), lookup(b, field));
            let ordering = if as_i64(direction).unwrap_or(1) < 0 { ordering.reverse() } else { ordering };
            if ordering.is_ne() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Option<Document>> {
        let options = FindOptions { limit: Some(1), ..options.clone() };
        let mut cursor = self.find(collection, filter, &options).await?;
        let first = cursor.next().await;
        cursor.close().await?;
        first
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Box<dyn Cursor>> {
        let collections = self.collections.read().await;
        let mut documents = Vec::new();
        if let Some(coll) = collections.get(collection) {
            for document in &coll.documents {
                if matches(document, filter)? {
                    documents.push(document.clone());
                }
            }
        }
        drop(collections);

        sort_documents(&mut documents, &options.sort);

        let skip = options.skip.unwrap_or(0) as usize;
        let mut documents: Vec<Document> = documents.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit.filter(|l| *l != 0) {
            documents.truncate(limit.unsigned_abs() as usize);
        }

        Ok(Box::new(VecCursor::new(documents)))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<ObjectId> {
        let id = match document.get("_id") {
            None | Some(Bson::Null) => ObjectId::new(),
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => bail!("_id must be an ObjectId, got {}", other),
        };

        let mut stored = Document::new();
        stored.insert("_id", id);
        for (key, value) in document {
            if key != "_id" {
                stored.insert(key, value);
            }
        }

        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();
        if let Some(field) = coll.unique_conflict(&stored, None, &BTreeMap::new()) {
            bail!("E11000 duplicate key error collection: {} index: {}", collection, field);
        }
        coll.documents.push(stored);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, false).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, true).await
    }

    async fn delete_one(&self, collection: &str, filter: &Document) -> Result<DeleteResult> {
        self.delete(collection, filter, false).await
    }

    async fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult> {
        self.delete(collection, filter, true).await
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64> {
        let collections = self.collections.read().await;
        match collections.get(collection) {
            Some(coll) => Ok(coll.matching(filter)?.len() as u64),
            None => Ok(0),
        }
    }

    async fn create_index(&self, collection: &str, field: &str, unique: bool) -> Result<String> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();

        if unique {
            let mut seen: Vec<&Bson> = Vec::new();
            for document in &coll.documents {
                if let Some(value) = lookup(document, field).filter(|v| **v != Bson::Null) {
                    if seen.iter().any(|s| values_equal(s, value)) {
                        bail!(
                            "cannot create unique index on {}.{}: duplicate value {}",
                            collection,
                            field,
                            value
                        );
                    }
                    seen.push(value);
                }
            }
        }

        coll.indexes.insert(field.to_string(), unique);
        Ok(format!("{}_1", field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::collect_cursor;
    use bson::doc;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, age) in [("alice", 30), ("bob", 25), ("carol", 41)] {
            store.insert_one("people", doc! { "name": name, "age": age }).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insert_generates_id() {
        let store = MemoryStore::new();
        let id = store.insert_one("people", doc! { "name": "alice" }).await.unwrap();
        let found = store
            .find_one("people", &doc! { "_id": id }, &FindOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("name").unwrap(), "alice");
        assert_eq!(found.keys().next().map(String::as_str), Some("_id"));
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit() {
        let store = seeded().await;
        let options = FindOptions::new().with_sort(doc! { "age": -1 }).with_skip(1).with_limit(1);
        let mut cursor = store.find("people", &doc! {}, &options).await.unwrap();
        let documents = collect_cursor(cursor.as_mut()).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].get_str("name").unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = seeded().await;
        let result = store
            .update_many("people", &doc! { "age": { "$lt": 35 } }, &doc! { "$set": { "junior": true } })
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched_count: 2, modified_count: 2 });
        assert_eq!(store.count("people", &doc! { "junior": true }).await.unwrap(), 2);

        let deleted = store.delete_many("people", &doc! { "junior": true }).await.unwrap();
        assert_eq!(deleted.deleted_count, 2);
        assert_eq!(store.document_count("people").await, 1);
    }

    #[tokio::test]
    async fn test_update_requires_operators() {
        let store = seeded().await;
        assert!(store.update_one("people", &doc! {}, &doc! { "age": 1 }).await.is_err());
    }

    #[tokio::test]
    async fn test_unique_index_enforced() {
        let store = seeded().await;
        store.create_index("people", "name", true).await.unwrap();
        assert!(store.insert_one("people", doc! { "name": "bob" }).await.is_err());

        let err = store
            .update_one("people", &doc! { "name": "alice" }, &doc! { "$set": { "name": "bob" } })
            .await;
        assert!(err.is_err());
        assert_eq!(store.count("people", &doc! { "name": "alice" }).await.unwrap(), 1);
        assert_eq!(store.indexes("people").await, vec![("name".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_update_many_checks_unique_against_staged_changes() {
        let store = MemoryStore::new();
        store.insert_one("tags", doc! { "slug": "a", "group": 1 }).await.unwrap();
        store.insert_one("tags", doc! { "slug": "b", "group": 1 }).await.unwrap();
        store.insert_one("tags", doc! { "slug": "c", "group": 2 }).await.unwrap();
        store.create_index("tags", "slug", true).await.unwrap();

        // Both group-1 documents would end up with the same slug
        let err = store
            .update_many("tags", &doc! { "group": 1 }, &doc! { "$set": { "slug": "z" } })
            .await;
        assert!(err.is_err());
        assert_eq!(store.count("tags", &doc! { "slug": "z" }).await.unwrap(), 0);
        assert_eq!(store.count("tags", &doc! { "slug": "a" }).await.unwrap(), 1);

        let result = store
            .update_many("tags", &doc! { "group": 1 }, &doc! { "$set": { "group": 3 } })
            .await
            .unwrap();
        assert_eq!(result.modified_count, 2);
        assert_eq!(store.count("tags", &doc! { "group": 3 }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_existing_duplicates() {
        let store = seeded().await;
        store.insert_one("people", doc! { "name": "alice" }).await.unwrap();
        assert!(store.create_index("people", "name", true).await.is_err());
        assert_eq!(store.create_index("people", "name", false).await.unwrap(), "name_1");
    }
}
