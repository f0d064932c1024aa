//! Partial updates that revalidate the whole document before writing
//!
//! An update only carries some fields, so validating the payload alone says
//! nothing about required fields or bounds elsewhere in the document. The
//! payload is overlaid on the stored snapshot, the result is rebuilt as the
//! schema's record type and validated; only then is the `$set` issued.
//! Nothing is written when validation fails.

use super::{parse_object_id, Model, CREATED_AT, UPDATED_AT};
use crate::error::{Error, Result, Rule, ValidationErrors};
use crate::query::Builder;
use crate::store::FindOptions;
use bson::{doc, Bson, Document};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Fields to set in an update, in generic document form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload(Document);

impl UpdatePayload {
    pub fn new(fields: Document) -> Self {
        Self(fields)
    }

    /// Normalize any serializable map or struct
    pub fn from_serialize<S: Serialize + ?Sized>(value: &S) -> Result<Self> {
        bson::to_document(value).map(Self).map_err(|e| {
            Error::Validation(ValidationErrors::single(
                None,
                Rule::Payload,
                format!("update must be a map or document: {}", e),
            ))
        })
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl From<Document> for UpdatePayload {
    fn from(fields: Document) -> Self {
        Self(fields)
    }
}

impl From<HashMap<String, Bson>> for UpdatePayload {
    fn from(fields: HashMap<String, Bson>) -> Self {
        Self(fields.into_iter().collect())
    }
}

impl From<BTreeMap<String, Bson>> for UpdatePayload {
    fn from(fields: BTreeMap<String, Bson>) -> Self {
        Self(fields.into_iter().collect())
    }
}

impl From<Vec<(String, Bson)>> for UpdatePayload {
    fn from(fields: Vec<(String, Bson)>) -> Self {
        Self(fields.into_iter().collect())
    }
}

/// Snapshot with every update field written over it
fn overlay(snapshot: Document, update: &Document) -> Document {
    let mut merged = snapshot;
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

impl Model {
    /// Strip creation stamps and refresh `updatedAt` when timestamps are enabled
    pub(crate) fn prepare_update(&self, payload: UpdatePayload) -> Document {
        let mut update = payload.into_document();
        update.remove(CREATED_AT);
        update.remove("CreatedAt");
        if self.schema().timestamps() {
            update.insert(UPDATED_AT, self.clock().now_bson());
        }
        update
    }

    /// Validate the hypothetical post-update document
    ///
    /// Skipped when the schema has no type witness.
    pub(crate) fn revalidate(&self, snapshot: Document, update: &Document) -> Result<()> {
        let Some(witness) = self.schema().witness() else {
            return Ok(());
        };

        let instance = witness.rebuild(overlay(snapshot, update)).map_err(|e| {
            log::warn!(
                "Failed to convert document to {} for validation: {}",
                witness.type_name(),
                e
            );
            e
        })?;

        self.schema().validate_document(instance.as_ref()).map_err(|e| {
            log::warn!("Document validation failed: {}", e);
            e
        })
    }

    /// Update one document by id, revalidating the merged result first
    pub async fn update_by_id(&self, id: &str, update: impl Into<UpdatePayload>) -> Result<()> {
        let store = self.store()?;
        let object_id = parse_object_id(id)?;
        let filter = doc! { "_id": object_id };

        let snapshot = store
            .find_one(self.collection_name(), &filter, &FindOptions::default())
            .await
            .map_err(|e| {
                log::warn!("Failed to retrieve document with ID {} for update: {}", id, e);
                Error::Database(format!("failed to retrieve document: {}", e))
            })?
            .ok_or_else(|| {
                log::warn!("Document not found with ID: {}", id);
                Error::NotFound(id.to_string())
            })?;

        let update = self.prepare_update(update.into());
        self.revalidate(snapshot, &update)?;

        store.update_one(self.collection_name(), &filter, &doc! { "$set": update }).await.map_err(
            |e| {
                log::warn!("Failed to update document with ID {}: {}", id, e);
                Error::Database(format!("failed to update document: {}", e))
            },
        )?;
        Ok(())
    }

    /// Update every document matched by `query`; returns the modified count
    ///
    /// Each match is revalidated first. One failure aborts the call before
    /// any document is written.
    pub async fn update_with_query(
        &self,
        query: &Builder,
        update: impl Into<UpdatePayload>,
    ) -> Result<u64> {
        let store = self.store()?;
        let filter = query.filter_document().map_err(|e| {
            log::warn!("Failed to build query: {}", e);
            e
        })?;
        let update = self.prepare_update(update.into());

        if self.schema().witness().is_some() {
            let mut cursor = store
                .find(self.collection_name(), &filter, &FindOptions::default())
                .await
                .map_err(|e| {
                    log::warn!("Failed to retrieve documents for validation: {}", e);
                    Error::Database(format!("failed to retrieve documents for validation: {}", e))
                })?;

            let checked = loop {
                match cursor.next().await {
                    Ok(Some(snapshot)) => {
                        if let Err(e) = self.revalidate(snapshot, &update) {
                            break Err(e);
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(e) => {
                        log::warn!("Error during cursor iteration: {}", e);
                        break Err(Error::Database(format!("error during cursor iteration: {}", e)));
                    }
                }
            };
            if let Err(e) = cursor.close().await {
                log::warn!("Failed to close cursor: {}", e);
            }
            checked?;
        }

        let result = store
            .update_many(self.collection_name(), &filter, &doc! { "$set": update })
            .await
            .map_err(|e| {
                log::warn!("Failed to update documents with query: {}", e);
                Error::Database(format!("failed to update documents: {}", e))
            })?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_update_wins() {
        let merged = overlay(doc! { "a": 1, "b": 2 }, &doc! { "b": 3, "c": 4 });
        assert_eq!(merged, doc! { "a": 1, "b": 3, "c": 4 });
    }

    #[test]
    fn test_payload_conversions() {
        let mut map = HashMap::new();
        map.insert("age".to_string(), Bson::Int32(30));
        assert_eq!(UpdatePayload::from(map).as_document(), &doc! { "age": 30 });

        #[derive(Serialize)]
        struct Rename<'a> {
            name: &'a str,
        }
        let payload = UpdatePayload::from_serialize(&Rename { name: "Ada" }).unwrap();
        assert_eq!(payload.into_document(), doc! { "name": "Ada" });

        let err = UpdatePayload::from_serialize(&42).unwrap_err();
        assert!(err.is_validation());
    }
}
