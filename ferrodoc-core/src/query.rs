//! Fluent filter and find-options builder
//!
//! ```rust,ignore
//! let query = Builder::new()
//!     .greater_than_or_equal("age", 18)
//!     .regex("name", "^a", Some("i"))
//!     .sort_by("age", false)
//!     .limit(10);
//! let people = users.find_with_query(&query).await?;
//! ```
//!
//! The first invalid call is remembered and every later call is a no-op;
//! the error surfaces from [`Builder::build`].

use crate::error::{Error, Result};
use crate::store::FindOptions;
use bson::{Bson, Document};

/// Filter operator names
pub mod op {
    pub const EQUAL: &str = "$eq";
    pub const NOT_EQUAL: &str = "$ne";
    pub const GREATER_THAN: &str = "$gt";
    pub const GREATER_EQUAL: &str = "$gte";
    pub const LESS_THAN: &str = "$lt";
    pub const LESS_EQUAL: &str = "$lte";
    pub const IN: &str = "$in";
    pub const NOT_IN: &str = "$nin";
    pub const EXISTS: &str = "$exists";
    pub const REGEX: &str = "$regex";
    pub const OPTIONS: &str = "$options";
}

#[derive(Debug, Default)]
pub struct Builder {
    filter: Document,
    sort: Document,
    limit: i64,
    skip: i64,
    err: Option<Error>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn fail(mut self, message: &str) -> Self {
        if self.err.is_none() {
            self.err = Some(Error::validation(message));
        }
        self
    }

    /// Plain equality condition
    pub fn filter(mut self, key: &str, value: impl Into<Bson>) -> Self {
        if self.err.is_some() {
            return self;
        }
        if key.is_empty() {
            return self.fail("key cannot be empty");
        }
        self.filter.insert(key, value.into());
        self
    }

    /// Condition `{key: {operator: value}}`, merged with existing operators on `key`
    pub fn operator(mut self, key: &str, operator: &str, value: impl Into<Bson>) -> Self {
        if self.err.is_some() {
            return self;
        }
        if key.is_empty() {
            return self.fail("key cannot be empty");
        }
        if operator.is_empty() {
            return self.fail("operator cannot be empty");
        }

        let value = value.into();
        if let Some(Bson::Document(existing)) = self.filter.get_mut(key) {
            if is_operator_map(existing) {
                existing.insert(operator, value);
                return self;
            }
        }
        let mut condition = Document::new();
        condition.insert(operator, value);
        self.filter.insert(key, condition);
        self
    }

    pub fn equals(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::EQUAL, value)
    }

    pub fn not_equals(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::NOT_EQUAL, value)
    }

    pub fn greater_than(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::GREATER_THAN, value)
    }

    pub fn greater_than_or_equal(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::GREATER_EQUAL, value)
    }

    pub fn less_than(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::LESS_THAN, value)
    }

    pub fn less_than_or_equal(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, op::LESS_EQUAL, value)
    }

    pub fn in_list<I, V>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator(key, op::IN, values)
    }

    pub fn not_in<I, V>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator(key, op::NOT_IN, values)
    }

    pub fn exists(self, key: &str, exists: bool) -> Self {
        self.operator(key, op::EXISTS, exists)
    }

    pub fn regex(self, key: &str, pattern: &str, options: Option<&str>) -> Self {
        let builder = self.operator(key, op::REGEX, pattern);
        match options.filter(|o| !o.is_empty()) {
            Some(options) => builder.operator(key, op::OPTIONS, options),
            None => builder,
        }
    }

    /// Add or replace a sort key; keys apply in the order first added
    pub fn sort_by(mut self, key: &str, ascending: bool) -> Self {
        if self.err.is_some() {
            return self;
        }
        if key.is_empty() {
            return self.fail("sort key cannot be empty");
        }
        self.sort.insert(key, if ascending { 1 } else { -1 });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        if self.err.is_some() {
            return self;
        }
        if limit < 0 {
            return self.fail("limit cannot be negative");
        }
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        if self.err.is_some() {
            return self;
        }
        if skip < 0 {
            return self.fail("skip cannot be negative");
        }
        self.skip = skip;
        self
    }

    /// Merge a raw filter; operator maps on the same key are combined
    pub fn merge_filter(mut self, filter: Document) -> Self {
        if self.err.is_some() {
            return self;
        }
        for (key, value) in filter {
            if let (Some(Bson::Document(existing)), Bson::Document(incoming)) =
                (self.filter.get_mut(&key), &value)
            {
                if is_operator_map(existing) && is_operator_map(incoming) {
                    for (op, arg) in incoming {
                        existing.insert(op.clone(), arg.clone());
                    }
                    continue;
                }
            }
            self.filter.insert(key, value);
        }
        self
    }

    /// The filter alone
    pub fn filter_document(&self) -> Result<Document> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(self.filter.clone()),
        }
    }

    /// Filter plus sort/limit/skip
    pub fn build(&self) -> Result<(Document, FindOptions)> {
        let filter = self.filter_document()?;
        let options = FindOptions {
            sort: self.sort.clone(),
            skip: (self.skip > 0).then_some(self.skip as u64),
            limit: (self.limit > 0).then_some(self.limit),
        };
        Ok((filter, options))
    }
}

fn is_operator_map(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|k| k.starts_with('$'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_operators_merge_on_same_key() {
        let (filter, _) = Builder::new()
            .greater_than_or_equal("age", 18)
            .less_than("age", 65)
            .equals("status", "active")
            .build()
            .unwrap();
        assert_eq!(filter, doc! { "age": { "$gte": 18, "$lt": 65 }, "status": { "$eq": "active" } });
    }

    #[test]
    fn test_operator_replaces_plain_value() {
        let (filter, _) = Builder::new().filter("age", 30).greater_than("age", 20).build().unwrap();
        assert_eq!(filter, doc! { "age": { "$gt": 20 } });
    }

    #[test]
    fn test_regex_with_options() {
        let (filter, _) = Builder::new().regex("name", "^jo", Some("i")).build().unwrap();
        assert_eq!(filter, doc! { "name": { "$regex": "^jo", "$options": "i" } });
    }

    #[test]
    fn test_options() {
        let (_, options) =
            Builder::new().sort_by("age", false).sort_by("name", true).limit(5).skip(10).build().unwrap();
        assert_eq!(options.sort, doc! { "age": -1, "name": 1 });
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, Some(10));

        let (_, options) = Builder::new().build().unwrap();
        assert_eq!(options, FindOptions::default());
    }

    #[test]
    fn test_first_error_sticks() {
        let builder = Builder::new().filter("", 1).limit(-1).equals("name", "x");
        let err = builder.build().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.details(), "key cannot be empty");
        assert!(builder.error().is_some());
    }

    #[test]
    fn test_merge_filter() {
        let (filter, _) = Builder::new()
            .greater_than("age", 18)
            .merge_filter(doc! { "age": { "$lt": 30 }, "city": "Paris" })
            .build()
            .unwrap();
        assert_eq!(filter, doc! { "age": { "$gt": 18, "$lt": 30 }, "city": "Paris" });
    }

    #[test]
    fn test_in_list() {
        let (filter, _) = Builder::new().in_list("role", ["admin", "dev"]).build().unwrap();
        assert_eq!(filter, doc! { "role": { "$in": ["admin", "dev"] } });
    }
}
