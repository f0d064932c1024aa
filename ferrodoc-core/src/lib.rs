//! Ferrodoc - Core
//!
//! A typed schema and validation layer over document stores.
//!
//! # Overview
//!
//! Records are plain Rust structs. `#[derive(Record)]` lets Ferrodoc read
//! their shape at runtime, so a [`Schema`] can be generated from the type
//! instead of being written by hand. Field constraints come from
//! `#[schema("...")]` attributes, and every write goes through the schema:
//! creates are validated in full, and partial updates are overlaid on the
//! stored document and revalidated as a whole before anything is written.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ferrodoc_core::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Record, Serialize, Deserialize, Clone, Debug, Default)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     #[schema("required")]
//!     pub name: String,
//!     #[schema("min=18,max=120")]
//!     pub age: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::connect(Arc::new(MemoryStore::new()), "app").await?;
//!     let users = client.typed_model::<User>("User", Schema::generate::<User>()).await?;
//!
//!     let id = users.create(&mut User { name: "Ada".into(), age: 36, ..Default::default() }).await?;
//!
//!     // Rejected: the merged document would violate the minimum age
//!     assert!(users.update_by_id(&id.to_hex(), doc! { "age": 12 }).await.is_err());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`introspect`] - Type descriptors and zero values
//! - [`schema`] - Schema generation, tag parsing and validation
//! - [`model`] - Create, find, update and delete through a schema
//! - [`query`] - Fluent filter builder
//! - [`store`] - Document store abstraction and an in-memory backend
//! - [`connection`] - Clients and the named-connection registry

// Allow the derive macros to refer to `::ferrodoc_core` from inside this crate's tests
extern crate self as ferrodoc_core;

pub mod clock;
pub mod config; // TOML + env configuration
pub mod connection;
pub mod error;
pub mod introspect;
pub mod logging; // `log` backend with json/human/logfmt output
pub mod model;
pub mod model_inspect; // Field access by storage name
pub mod prelude;
pub mod query;
pub mod schema;
pub mod store;

// Re-export derive macros from ferrodoc-macros so users only need one crate
#[cfg(feature = "macros")]
pub use ferrodoc_macros::{Record, Scalar};

pub use bson;

pub use connection::{Client, Registry, DEFAULT_CONNECTION};
pub use error::{Error, ErrorKind, Result, Rule, ValidationErrors, Violation};
pub use model::{Model, ModelOptions, TypedModel, UpdatePayload};
pub use model_inspect::{FieldAccess, Inspectable, Record};
pub use schema::{FieldConstraint, Schema};

/// Paths used by generated code
#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use bson;
}
