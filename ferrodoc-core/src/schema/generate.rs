//! Schema derivation from record descriptors

use super::{parse_schema_tag, FieldConstraint, Schema};
use crate::introspect::{Describe, FieldType, RecordRef};
use std::collections::BTreeMap;

/// Storage name of the document identifier
const ID_FIELD: &str = "_id";

impl Schema {
    /// Derive a schema from a record type
    ///
    /// # Panics
    ///
    /// Panics if `T` is not a record (after unwrapping `Option`/`Box`/...).
    /// This is a programming error, not a runtime condition.
    pub fn generate<T: Describe>() -> Schema {
        Self::generate_from(&T::field_type())
    }

    /// Derive a schema from an already-built type descriptor
    ///
    /// # Panics
    ///
    /// Panics if `ty` does not resolve to a record.
    pub fn generate_from(ty: &FieldType) -> Schema {
        let record = match ty.unwrap_pointer() {
            FieldType::Record(record) => *record,
            other => panic!("schema can only be generated from a record type, got {}", other),
        };

        let mut schema = Schema::new();
        schema.fields = derive_fields(record, &mut Vec::new());
        log::debug!("derived schema for {} with {} fields", record.name(), schema.fields.len());
        schema
    }
}

fn is_id_field(ident: &str, storage_name: &str) -> bool {
    ident == "id" || storage_name.starts_with(ID_FIELD)
}

fn derive_fields(
    record: RecordRef,
    path: &mut Vec<&'static str>,
) -> BTreeMap<String, FieldConstraint> {
    let mut fields = BTreeMap::new();
    path.push(record.name());

    for field in record.descriptor().fields {
        if !field.public || field.skipped {
            continue;
        }
        let name = field.storage_name();
        if is_id_field(field.ident, name) {
            continue;
        }

        if field.flatten {
            // Flattened records share the parent's namespace
            if let FieldType::Record(inner) = field.ty.unwrap_pointer() {
                if !path.contains(&inner.name()) {
                    for (name, constraint) in derive_fields(*inner, path) {
                        fields.entry(name).or_insert(constraint);
                    }
                }
            }
            continue;
        }

        let constraint = FieldConstraint::from_tag(field.ty.clone(), &parse_schema_tag(field.tag));
        // An earlier member sharing the storage name keeps it
        fields.entry(name.to_string()).or_insert(constraint);
    }

    path.pop();
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{FieldDescriptor, RecordDescriptor};

    fn field(ident: &'static str, tag: &'static str, ty: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            ident,
            rename: None,
            tag,
            public: true,
            skipped: false,
            flatten: false,
            ty,
        }
    }

    fn address() -> RecordDescriptor {
        RecordDescriptor { name: "Address", fields: vec![field("street", "required", FieldType::String)] }
    }

    fn customer() -> RecordDescriptor {
        let mut embedded = field("address", "", FieldType::Record(RecordRef::new("Address", address)));
        embedded.flatten = true;
        let mut hidden = field("secret", "required", FieldType::String);
        hidden.public = false;
        RecordDescriptor {
            name: "Customer",
            fields: vec![
                field("id", "", FieldType::ObjectId),
                field("name", "required,min=2", FieldType::String),
                embedded,
                hidden,
            ],
        }
    }

    #[test]
    fn test_flatten_and_skips() {
        let schema = Schema::generate_from(&FieldType::Record(RecordRef::new("Customer", customer)));
        let keys: Vec<&str> = schema.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "street"]);
        assert!(schema.field("street").map(|f| f.required).unwrap_or(false));
        assert_eq!(schema.field("name").and_then(|f| f.min), Some(2));
    }

    #[test]
    #[should_panic(expected = "record type")]
    fn test_non_record_panics() {
        Schema::generate_from(&FieldType::String);
    }
}
