mod common;

use common::Person;
use ferrodoc_core::bson::Bson;
use ferrodoc_core::model_inspect::{FieldAccess, Inspectable};
use ferrodoc_core::{FieldConstraint, Record, Rule, Schema};
use serde::{Deserialize, Serialize};

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Product {
    #[schema("required")]
    pub sku: String,
    #[schema("min=0,max=1000")]
    pub stock: i64,
    pub status: String,
    pub price: f64,
    #[schema("min=1")]
    pub discount: Option<i32>,
}

fn product_schema() -> Schema {
    let mut schema = Schema::generate::<Product>();
    let status = schema.field("status").unwrap().clone().one_of(["draft", "live"]);
    schema.insert_field("status", status);
    let price = schema.field("price").unwrap().clone().validate_with(|v| {
        v.as_f64().is_some_and(|p| p > 0.0)
    });
    schema.insert_field("price", price);
    schema
}

fn valid_product() -> Product {
    Product {
        sku: "P-100".into(),
        stock: 10,
        status: "live".into(),
        price: 9.5,
        discount: None,
    }
}

#[test]
fn test_well_formed_instance_passes() {
    product_schema().validate_document(&valid_product()).unwrap();
    Schema::generate::<Person>().validate_document(&Person::new("Ada", 36)).unwrap();
}

#[test]
fn test_all_violations_reported_in_field_order() {
    let err = product_schema().validate_document(&Product::default()).unwrap_err();
    assert!(err.is_validation());

    let violations = err.validation_errors().unwrap().violations();
    let summary: Vec<(Option<&str>, Rule)> =
        violations.iter().map(|v| (v.field.as_deref(), v.rule)).collect();
    assert_eq!(
        summary,
        vec![
            (Some("price"), Rule::Custom),
            (Some("sku"), Rule::Required),
            (Some("status"), Rule::Enum),
        ]
    );
}

#[test]
fn test_zero_minimum_is_enforced() {
    let product = Product { stock: -1, ..valid_product() };
    let err = product_schema().validate_document(&product).unwrap_err();

    assert_eq!(
        err.to_string(),
        "validation failed: field 'stock' value -1 is less than minimum 0"
    );
}

#[test]
fn test_maximum() {
    let product = Product { stock: 1001, ..valid_product() };
    let err = product_schema().validate_document(&product).unwrap_err();

    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.violations()[0].rule, Rule::Max);
}

#[test]
fn test_absent_optional_value_skips_bounds() {
    let schema = product_schema();
    schema.validate_document(&valid_product()).unwrap();

    let product = Product { discount: Some(0), ..valid_product() };
    let err = schema.validate_document(&product).unwrap_err();
    assert_eq!(err.validation_errors().unwrap().for_field("discount").count(), 1);
}

#[test]
fn test_custom_validator_replaces_builtin_checks() {
    let schema = product_schema().with_validator(|doc| {
        match doc.get_field_value("sku") {
            Some(Bson::String(sku)) if sku.starts_with('P') => Ok(()),
            _ => anyhow::bail!("sku must start with P"),
        }
    });

    // Out-of-range stock is no longer checked
    schema.validate_document(&Product { stock: 5000, ..valid_product() }).unwrap();

    let err = schema.validate_document(&Product { sku: "X-1".into(), ..valid_product() }).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "validation failed: sku must start with P");
}

#[test]
fn test_non_record_document() {
    let err = product_schema().validate_document(&Bson::Int32(7)).unwrap_err();
    assert_eq!(err.validation_errors().unwrap().violations()[0].rule, Rule::Document);
}

#[test]
fn test_required_field_missing_from_generic_document() {
    let mut schema = Schema::new();
    schema.insert_field("title", FieldConstraint::of::<String>().required());

    let err = schema.validate_document(&ferrodoc_core::bson::doc! {}).unwrap_err();
    assert_eq!(err.to_string(), "validation failed: required field 'title' not found in document");
}

#[test]
fn test_field_access_by_storage_name() {
    let mut product = valid_product();
    product.set_field_value("stock", Bson::Int32(42)).unwrap();
    assert_eq!(product.stock, 42);
    assert_eq!(product.get_field_value("discount"), Some(Bson::Null));
    assert!(product.set_field_value("missing", Bson::Null).is_err());
    assert!(product.set_field_value("stock", Bson::String("many".into())).is_err());
}

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Counter {
    #[schema("required")]
    pub n: u64,
}

#[test]
fn test_unstorable_value_is_a_type_violation() {
    let schema = Schema::generate::<Counter>();
    let counter = Counter { n: u64::MAX };

    assert!(counter.try_field_value("n").is_err());
    let errors = schema.check(&counter);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.violations()[0].rule, Rule::Type);
    assert_eq!(errors.violations()[0].field.as_deref(), Some("n"));

    assert!(schema.validate_document(&Counter { n: 7 }).is_ok());
}

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Site {
    pub street: String,
    #[schema("required")]
    pub city: String,
}

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Listing {
    #[schema("required")]
    pub city: String,
    #[serde(flatten)]
    pub site: Site,
}

#[test]
fn test_first_declared_member_owns_a_shared_name() {
    let schema = Schema::generate::<Listing>();
    let listing = Listing {
        city: String::new(),
        site: Site { street: "Main".into(), city: "Paris".into() },
    };

    assert_eq!(listing.get_field_value("city"), Some(Bson::String(String::new())));
    assert_eq!(listing.get_field_value("street"), Some(Bson::String("Main".into())));

    let errors = schema.check(&listing);
    let rules: Vec<Rule> = errors.violations().iter().map(|v| v.rule).collect();
    assert_eq!(rules, vec![Rule::Required]);
    assert_eq!(errors.violations()[0].message, "required field 'city' is empty");

    let mut listing = listing;
    listing.set_field_value("city", Bson::String("Lyon".into())).unwrap();
    assert_eq!(listing.city, "Lyon");
    assert_eq!(listing.site.city, "Paris");
}
