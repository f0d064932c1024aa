//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use ferrodoc_core::prelude::*;
//! ```

// === Derive macros (from ferrodoc-macros) ===
#[cfg(feature = "macros")]
pub use crate::Scalar;
// Both the `Record` trait and, with the `macros` feature, its derive
pub use crate::Record;

// === Records and schemas ===
pub use crate::introspect::{Describe, FieldType};
pub use crate::model_inspect::{FieldAccess, Inspectable};
pub use crate::schema::{FieldConstraint, Schema, SAVE_EVENT};

// === Models and queries ===
pub use crate::model::{Model, ModelOptions, TypedModel, UpdatePayload};
pub use crate::query::Builder as QueryBuilder;

// === Connections and stores ===
pub use crate::connection::{Client, Registry, DEFAULT_CONNECTION};
pub use crate::store::{DocumentStore, FindOptions, MemoryStore};

// === Configuration ===
pub use crate::config::FerrodocConfig;
pub use crate::logging::LoggingConfig;

// === Errors ===
pub use crate::error::{Error, Result, Rule};

// === Document values ===
pub use bson::{doc, oid::ObjectId, Bson, Document};

pub use std::sync::Arc;
