use crate::introspect::Describe;
use bson::{Bson, Document};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Trait for reading fields of a document instance by storage name
///
/// Validation and the create path go through this instead of serializing
/// the whole instance.
pub trait Inspectable {
    /// Get the value of a specific field by storage name
    /// Returns None if the field doesn't exist
    fn get_field_value(&self, field_name: &str) -> Option<Bson>;

    /// Whether the instance is a record value (struct or document)
    fn is_record(&self) -> bool {
        true
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.get_field_value(field_name).is_some()
    }

    /// Like `get_field_value`, but a present value that cannot be converted
    /// to BSON is an error instead of `None`
    fn try_field_value(&self, field_name: &str) -> Result<Option<Bson>, String> {
        Ok(self.get_field_value(field_name))
    }
}

/// Write access by storage name, used by middlewares and defaults
pub trait FieldAccess: Inspectable {
    fn set_field_value(&mut self, field_name: &str, value: Bson) -> anyhow::Result<()>;
}

/// A typed document: describable, field-addressable and serde round-trippable
///
/// Implemented by `#[derive(Record)]`.
pub trait Record:
    Describe + FieldAccess + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn descriptor() -> crate::introspect::RecordDescriptor;
}

impl Inspectable for Document {
    fn get_field_value(&self, field_name: &str) -> Option<Bson> {
        self.get(field_name).cloned()
    }
}

impl FieldAccess for Document {
    fn set_field_value(&mut self, field_name: &str, value: Bson) -> anyhow::Result<()> {
        self.insert(field_name, value);
        Ok(())
    }
}

impl Inspectable for HashMap<String, Bson> {
    fn get_field_value(&self, field_name: &str) -> Option<Bson> {
        self.get(field_name).cloned()
    }
}

impl FieldAccess for HashMap<String, Bson> {
    fn set_field_value(&mut self, field_name: &str, value: Bson) -> anyhow::Result<()> {
        self.insert(field_name.to_string(), value);
        Ok(())
    }
}

impl Inspectable for BTreeMap<String, Bson> {
    fn get_field_value(&self, field_name: &str) -> Option<Bson> {
        self.get(field_name).cloned()
    }
}

impl FieldAccess for BTreeMap<String, Bson> {
    fn set_field_value(&mut self, field_name: &str, value: Bson) -> anyhow::Result<()> {
        self.insert(field_name.to_string(), value);
        Ok(())
    }
}

impl Inspectable for Bson {
    fn get_field_value(&self, field_name: &str) -> Option<Bson> {
        self.as_document().and_then(|doc| doc.get(field_name).cloned())
    }

    fn is_record(&self) -> bool {
        matches!(self, Bson::Document(_))
    }
}
