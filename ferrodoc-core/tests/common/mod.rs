//! Records shared by the integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use ferrodoc_core::bson::{self, oid::ObjectId};
use ferrodoc_core::clock::FixedClock;
use ferrodoc_core::Record;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Record, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Person {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[schema("required")]
    pub name: String,
    #[schema("min=18,max=100")]
    pub age: i32,
    pub email: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<bson::DateTime>,
}

impl Person {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_string(),
            age,
            email: format!("{}@example.com", name.to_lowercase()),
            ..Self::default()
        }
    }
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()))
}
