//! Procedural macros for Ferrodoc
//!
//! `Record` describes a struct to the schema layer and gives it field access
//! by storage name. `Scalar` marks a newtype or a unit-only enum as a named
//! scalar so schemas see it as its underlying primitive.

use proc_macro::TokenStream;

mod record;
mod scalar;
mod serde_attr;

/// Derive `Describe`, `Inspectable`, `FieldAccess` and `Record`
///
/// Field constraints are read from `#[schema("...")]`; storage names, flattening
/// and skipping follow the field's `#[serde(...)]` attributes.
///
/// # Example
///
/// ```rust,ignore
/// use ferrodoc_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Record, Serialize, Deserialize)]
/// pub struct Product {
///     #[schema("required,unique")]
///     pub sku: String,
///     #[schema("min=0")]
///     pub stock: i64,
///     #[serde(rename = "createdAt")]
///     pub created_at: Option<bson::DateTime>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(schema))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input.into()).into()
}

/// Derive `Describe` for a named scalar
///
/// ```rust,ignore
/// #[derive(Scalar, Serialize, Deserialize)]
/// pub struct Email(String);
///
/// #[derive(Scalar, Serialize, Deserialize)]
/// pub enum Status { Active, Suspended }
/// ```
#[proc_macro_derive(Scalar)]
pub fn derive_scalar(input: TokenStream) -> TokenStream {
    scalar::derive_scalar(input.into()).into()
}
