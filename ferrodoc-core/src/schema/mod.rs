//! Schemas: per-field constraints plus collection-level configuration
//!
//! A [`Schema`] is either derived from a record type with
//! [`Schema::generate`] or assembled by hand with [`Schema::insert_field`].
//! It is consumed by [`Schema::validate_document`] on every create and by
//! the revalidation pipeline on every update.

mod generate;
pub mod tag;
mod validate;

pub use tag::{parse_schema_tag, SchemaTag};

use crate::error::{Error, Result, Rule, ValidationErrors};
use crate::introspect::{values_equal, zero_value, Describe, FieldType};
use crate::model_inspect::{FieldAccess, Inspectable, Record};
use bson::{Bson, Document};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Lifecycle event run before a document is persisted
pub const SAVE_EVENT: &str = "save";

/// Hook run at a lifecycle event; may mutate the document or veto the write
pub type Middleware = Arc<dyn Fn(&mut dyn FieldAccess) -> anyhow::Result<()> + Send + Sync>;

/// Whole-document validator replacing the built-in checks
pub type DocumentValidator = Arc<dyn Fn(&dyn Inspectable) -> anyhow::Result<()> + Send + Sync>;

/// Per-field predicate, `true` means the value is acceptable
pub type FieldPredicate = Arc<dyn Fn(&Bson) -> bool + Send + Sync>;

/// Validation rules attached to one field
#[derive(Clone)]
pub struct FieldConstraint {
    pub field_type: FieldType,
    /// Placeholder zero value of `field_type`
    pub zero: Bson,
    pub required: bool,
    pub unique: bool,
    pub index: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub enum_values: Vec<Bson>,
    pub default: Option<Bson>,
    pub validate: Option<FieldPredicate>,
}

impl FieldConstraint {
    pub fn new(field_type: FieldType) -> Self {
        let zero = zero_value(&field_type);
        Self {
            field_type,
            zero,
            required: false,
            unique: false,
            index: false,
            min: None,
            max: None,
            enum_values: Vec::new(),
            default: None,
            validate: None,
        }
    }

    /// Unconstrained field of type `T`
    pub fn of<T: Describe>() -> Self {
        Self::new(T::field_type())
    }

    pub fn from_tag(field_type: FieldType, tag: &SchemaTag) -> Self {
        let mut constraint = Self::new(field_type);
        constraint.required = tag.required;
        constraint.unique = tag.unique;
        constraint.index = tag.index || tag.unique;
        constraint.min = tag.min;
        constraint.max = tag.max;
        constraint
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.index = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validate_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Bson) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(predicate));
        self
    }

    /// Default and enum members must be values of the declared field type
    pub fn check_types(&self, field: &str) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if let Some(default) = &self.default {
            if !self.field_type.admits(default) {
                errors.push(
                    Some(field.to_string()),
                    Rule::Type,
                    format!("field '{}' default {} is not a {}", field, default, self.field_type),
                );
            }
        }
        for value in &self.enum_values {
            if !self.field_type.admits(value) {
                errors.push(
                    Some(field.to_string()),
                    Rule::Type,
                    format!("field '{}' enum value {} is not a {}", field, value, self.field_type),
                );
            }
        }
        errors.into_result()
    }
}

impl fmt::Debug for FieldConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConstraint")
            .field("field_type", &self.field_type)
            .field("zero", &self.zero)
            .field("required", &self.required)
            .field("unique", &self.unique)
            .field("index", &self.index)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("enum_values", &self.enum_values)
            .field("default", &self.default)
            .field("validate", &self.validate.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl PartialEq for FieldConstraint {
    fn eq(&self, other: &Self) -> bool {
        let same_predicate = match (&self.validate, &other.validate) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.field_type == other.field_type
            && self.zero == other.zero
            && self.required == other.required
            && self.unique == other.unique
            && self.index == other.index
            && self.min == other.min
            && self.max == other.max
            && self.enum_values.len() == other.enum_values.len()
            && self.enum_values.iter().zip(&other.enum_values).all(|(a, b)| values_equal(a, b))
            && self.default == other.default
            && same_predicate
    }
}

/// Reference to the concrete record type a schema was built for
///
/// Used to rebuild typed instances from generic documents during
/// revalidation.
#[derive(Clone, Copy)]
pub struct TypeWitness {
    type_name: &'static str,
    rebuild: fn(Document) -> Result<Box<dyn Inspectable>>,
}

impl TypeWitness {
    pub fn of<T: Record>() -> Self {
        Self { type_name: std::any::type_name::<T>(), rebuild: rebuild_as::<T> }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decode `document` into a fresh instance of the witnessed type
    pub fn rebuild(&self, document: Document) -> Result<Box<dyn Inspectable>> {
        (self.rebuild)(document)
    }
}

impl fmt::Debug for TypeWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeWitness").field(&self.type_name).finish()
    }
}

fn rebuild_as<T: Record>(document: Document) -> Result<Box<dyn Inspectable>> {
    let instance: T = bson::from_document(document).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(Box::new(instance))
}

/// Field constraints and collection configuration for one entity type
#[derive(Clone)]
pub struct Schema {
    fields: BTreeMap<String, FieldConstraint>,
    timestamps: bool,
    collection: Option<String>,
    middlewares: HashMap<String, Vec<Middleware>>,
    validator: Option<DocumentValidator>,
    witness: Option<TypeWitness>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Empty schema with timestamps enabled
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            timestamps: true,
            collection: None,
            middlewares: HashMap::new(),
            validator: None,
            witness: None,
        }
    }

    /// Override the collection name (defaults to the model name)
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Replace all built-in checks with a whole-document validator
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&dyn Inspectable) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Register a middleware for `event`; middlewares run in registration order
    pub fn pre<F>(&mut self, event: &str, middleware: F) -> &mut Self
    where
        F: Fn(&mut dyn FieldAccess) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.middlewares.entry(event.to_string()).or_default().push(Arc::new(middleware));
        self
    }

    pub fn middlewares(&self, event: &str) -> &[Middleware] {
        self.middlewares.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn validator(&self) -> Option<&DocumentValidator> {
        self.validator.as_ref()
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldConstraint> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldConstraint> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldConstraint> {
        self.fields.get_mut(name)
    }

    /// Insert or replace the constraint stored under `name`
    pub fn insert_field(&mut self, name: impl Into<String>, constraint: FieldConstraint) {
        self.fields.insert(name.into(), constraint);
    }

    pub fn set_witness(&mut self, witness: TypeWitness) {
        self.witness = Some(witness);
    }

    pub fn witness(&self) -> Option<&TypeWitness> {
        self.witness.as_ref()
    }

    /// Check that every default and enum member matches its field type
    pub fn verify(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for (name, constraint) in &self.fields {
            if let Err(Error::Validation(found)) = constraint.check_types(name) {
                for v in found.violations() {
                    errors.push(v.field.clone(), v.rule, v.message.clone());
                }
            }
        }
        errors.into_result()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let middlewares: BTreeMap<&str, usize> =
            self.middlewares.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("timestamps", &self.timestamps)
            .field("collection", &self.collection)
            .field("middlewares", &middlewares)
            .field("validator", &self.validator.is_some())
            .field("witness", &self.witness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_schema_defaults() {
        let schema = Schema::new();
        assert!(schema.timestamps());
        assert!(schema.fields().is_empty());
        assert!(schema.middlewares(SAVE_EVENT).is_empty());
        assert!(schema.witness().is_none());
    }

    #[test]
    fn test_builder_options() {
        let schema = Schema::new().with_collection("people").with_timestamps(false);
        assert_eq!(schema.collection(), Some("people"));
        assert!(!schema.timestamps());
    }

    #[test]
    fn test_unique_implies_index() {
        let constraint = FieldConstraint::of::<String>().unique();
        assert!(constraint.index);
        let tagged = FieldConstraint::from_tag(
            FieldType::String,
            &SchemaTag { unique: true, ..SchemaTag::default() },
        );
        assert!(tagged.index);
    }

    #[test]
    fn test_verify_rejects_mistyped_default() {
        let mut schema = Schema::new();
        schema.insert_field("age", FieldConstraint::of::<i32>().default_value("old"));
        let err = schema.verify().unwrap_err();
        assert!(err.is_validation());

        schema.insert_field("age", FieldConstraint::of::<i32>().default_value(18));
        assert!(schema.verify().is_ok());
    }

    #[test]
    fn test_middleware_registration_order() {
        let mut schema = Schema::new();
        schema
            .pre(SAVE_EVENT, |doc| doc.set_field_value("a", Bson::Int32(1)))
            .pre(SAVE_EVENT, |doc| doc.set_field_value("b", Bson::Int32(2)));
        assert_eq!(schema.middlewares(SAVE_EVENT).len(), 2);
        assert!(schema.middlewares("delete").is_empty());
    }

    #[test]
    fn test_constraint_equality_ignores_number_width() {
        let a = FieldConstraint::of::<i64>().one_of([1i32, 2]);
        let b = FieldConstraint::of::<i64>().one_of([1i64, 2]);
        assert_eq!(a, b);
    }
}
