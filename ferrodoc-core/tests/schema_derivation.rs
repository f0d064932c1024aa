mod common;

use common::Person;
use ferrodoc_core::bson::{doc, oid::ObjectId, Bson};
use ferrodoc_core::introspect::{zero_value, Describe, FieldType};
use ferrodoc_core::{Record, Scalar, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Address {
    #[schema("required")]
    pub street: String,
    pub city: String,
}

#[derive(Record, Serialize, Deserialize, Debug, Clone)]
pub struct Customer {
    pub id: ObjectId,
    #[schema("required,unique,min=2,max=100")]
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(flatten)]
    pub address: Address,
    pub billing: Address,
    internal_note: String,
    #[serde(skip)]
    pub cached_score: u32,
}

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Node {
    pub label: String,
    pub parent: Option<Box<Node>>,
    pub children: Vec<Node>,
}

#[derive(Scalar, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Email(String);

#[derive(Scalar, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Status {
    Active,
    Suspended,
}

#[derive(Record, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub contact_email: Email,
    #[schema("index")]
    pub status: Status,
    pub scores: [i32; 3],
    pub labels: HashMap<String, i32>,
    pub by_rank: HashMap<i32, String>,
    pub tags: Vec<String>,
    pub settings: ferrodoc_core::bson::Document,
    pub anything: Bson,
}

#[test]
fn test_embedded_record_fields_flatten_into_parent() {
    let schema = Schema::generate::<Customer>();

    let street = schema.field("street").expect("street promoted from Address");
    assert!(street.required);
    assert!(schema.field("city").is_some());
    assert!(schema.field("address").is_none());
}

#[test]
fn test_excluded_fields() {
    let schema = Schema::generate::<Customer>();

    assert!(schema.field("id").is_none());
    assert!(schema.field("_id").is_none());
    assert!(schema.field("internal_note").is_none());
    assert!(schema.field("cached_score").is_none());
    assert!(Schema::generate::<Person>().field("_id").is_none());
}

#[test]
fn test_tag_and_rename() {
    let schema = Schema::generate::<Customer>();
    let name = schema.field("fullName").unwrap();

    assert!(name.required);
    assert!(name.unique);
    assert!(name.index);
    assert_eq!(name.min, Some(2));
    assert_eq!(name.max, Some(100));
    assert_eq!(name.zero, Bson::String(String::new()));
    assert!(schema.field("full_name").is_none());
}

#[test]
fn test_nested_record_zero_is_a_record_template() {
    let schema = Schema::generate::<Customer>();
    let billing = schema.field("billing").unwrap();

    assert!(billing.field_type.is_record());
    assert_eq!(billing.zero, Bson::Document(doc! { "street": "", "city": "" }));
}

#[test]
fn test_self_referential_record() {
    let schema = Schema::generate::<Node>();

    assert_eq!(schema.fields().len(), 3);
    assert_eq!(schema.field("parent").unwrap().zero, Bson::Null);
    assert_eq!(schema.field("children").unwrap().zero, Bson::Array(vec![]));

    // The record template stops at the first repeat of a type
    assert_eq!(
        zero_value(&Node::field_type()),
        Bson::Document(doc! { "label": "", "parent": Bson::Null, "children": [] })
    );
}

#[test]
fn test_zero_values_by_kind() {
    let schema = Schema::generate::<Account>();

    let email = schema.field("contactEmail").unwrap();
    assert_eq!(email.zero, Bson::String(String::new()));
    assert!(matches!(email.field_type, FieldType::Named { name: "Email", .. }));

    let status = schema.field("status").unwrap();
    assert!(status.index);
    assert!(!status.unique);
    assert_eq!(status.zero, Bson::String(String::new()));

    assert_eq!(schema.field("scores").unwrap().zero, Bson::Null);
    assert_eq!(schema.field("labels").unwrap().zero, Bson::Document(doc! {}));
    assert_eq!(schema.field("byRank").unwrap().zero, Bson::Null);
    assert_eq!(schema.field("tags").unwrap().zero, Bson::Array(vec![]));
    assert_eq!(schema.field("settings").unwrap().zero, Bson::Document(doc! {}));
    assert_eq!(schema.field("anything").unwrap().zero, Bson::Null);
}

#[test]
fn test_derivation_is_deterministic() {
    let first = Schema::generate::<Customer>();
    let second = Schema::generate::<Customer>();

    assert_eq!(first.fields(), second.fields());
    assert!(first.timestamps());
    assert!(first.middlewares(ferrodoc_core::schema::SAVE_EVENT).is_empty());
}

#[test]
fn test_unique_implies_index() {
    for schema in [Schema::generate::<Customer>(), Schema::generate::<Account>()] {
        for (name, constraint) in schema.fields() {
            assert!(!constraint.unique || constraint.index, "{} is unique but not indexed", name);
        }
    }
}

#[test]
fn test_generate_through_pointer() {
    let schema = Schema::generate::<Option<Box<Address>>>();
    assert!(schema.field("street").unwrap().required);
}

#[test]
#[should_panic(expected = "schema can only be generated from a record type")]
fn test_generate_rejects_scalars() {
    let _ = Schema::generate::<i32>();
}

#[test]
fn test_descriptor_reports_serde_attributes() {
    let descriptor = Customer::descriptor();
    let address = descriptor.fields.iter().find(|f| f.ident == "address").unwrap();
    assert!(address.flatten);

    let note = descriptor.fields.iter().find(|f| f.ident == "internal_note").unwrap();
    assert!(!note.public);

    let name = descriptor.fields.iter().find(|f| f.ident == "full_name").unwrap();
    assert_eq!(name.storage_name(), "fullName");
    assert_eq!(name.tag, "required,unique,min=2,max=100");
}
