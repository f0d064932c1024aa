//! Filter evaluation for the in-memory store
//!
//! Supports equality plus `$eq $ne $gt $gte $lt $lte $in $nin $exists $regex`,
//! dotted paths into embedded documents and "array contains" equality.

use crate::introspect::{as_f64, values_equal};
use anyhow::{bail, Result};
use bson::{Bson, Document};
use regex::RegexBuilder;
use std::cmp::Ordering;

/// Whether `document` satisfies every condition in `filter`
pub fn matches(document: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        let value = lookup(document, key);
        if !matches_condition(value, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolve a possibly dotted path
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|k| k.starts_with('$'))
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> Result<bool> {
    let operators = match condition {
        Bson::Document(ops) if is_operator_document(ops) => ops,
        Bson::RegularExpression(re) => return regex_match(value, &re.pattern, &re.options),
        _ => return Ok(equals(value, condition)),
    };

    for (op, arg) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(value, arg),
            "$ne" => !equals(value, arg),
            "$gt" => ordering(value, arg) == Some(Ordering::Greater),
            "$gte" => matches!(ordering(value, arg), Some(Ordering::Greater | Ordering::Equal)),
            "$lt" => ordering(value, arg) == Some(Ordering::Less),
            "$lte" => matches!(ordering(value, arg), Some(Ordering::Less | Ordering::Equal)),
            "$in" => in_list(value, arg)?,
            "$nin" => !in_list(value, arg)?,
            "$exists" => value.is_some() == truthy(arg),
            "$regex" => {
                let options = operators.get_str("$options").unwrap_or("");
                match arg {
                    Bson::String(pattern) => regex_match(value, pattern, options)?,
                    Bson::RegularExpression(re) => regex_match(value, &re.pattern, &re.options)?,
                    other => bail!("$regex expects a string, got {}", other),
                }
            }
            "$options" => true,
            other => bail!("unsupported filter operator {}", other),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => *expected == Bson::Null,
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn in_list(value: Option<&Bson>, list: &Bson) -> Result<bool> {
    match list {
        Bson::Array(candidates) => Ok(candidates.iter().any(|c| equals(value, c))),
        other => bail!("$in/$nin expects an array, got {}", other),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

fn ordering(value: Option<&Bson>, bound: &Bson) -> Option<Ordering> {
    compare_values(value?, bound)
}

fn regex_match(value: Option<&Bson>, pattern: &str, options: &str) -> Result<bool> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()?;
    Ok(match value {
        Some(Bson::String(s)) => re.is_match(s),
        Some(Bson::Array(items)) => items.iter().any(|i| i.as_str().is_some_and(|s| re.is_match(s))),
        _ => false,
    })
}

/// Ordering between two values of comparable types
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting; missing and null sort first
pub fn sort_order(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let rank = |v: Option<&Bson>| match v {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    };
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn person() -> Document {
        doc! {
            "name": "Alice",
            "age": 30,
            "tags": ["admin", "dev"],
            "address": { "city": "Lyon" },
        }
    }

    #[test]
    fn test_equality_and_operators() {
        let p = person();
        assert!(matches(&p, &doc! { "name": "Alice" }).unwrap());
        assert!(matches(&p, &doc! { "age": { "$gte": 30, "$lt": 31 } }).unwrap());
        assert!(!matches(&p, &doc! { "age": { "$gt": 30 } }).unwrap());
        assert!(matches(&p, &doc! { "age": { "$ne": 31i64 } }).unwrap());
        assert!(matches(&p, &doc! { "name": { "$in": ["Bob", "Alice"] } }).unwrap());
        assert!(matches(&p, &doc! { "name": { "$nin": ["Bob"] } }).unwrap());
    }

    #[test]
    fn test_paths_arrays_and_exists() {
        let p = person();
        assert!(matches(&p, &doc! { "address.city": "Lyon" }).unwrap());
        assert!(matches(&p, &doc! { "tags": "dev" }).unwrap());
        assert!(matches(&p, &doc! { "email": { "$exists": false } }).unwrap());
        assert!(!matches(&p, &doc! { "name": { "$exists": false } }).unwrap());
        assert!(matches(&p, &doc! { "email": Bson::Null }).unwrap());
    }

    #[test]
    fn test_regex() {
        let p = person();
        assert!(matches(&p, &doc! { "name": { "$regex": "^ali", "$options": "i" } }).unwrap());
        assert!(!matches(&p, &doc! { "name": { "$regex": "^ali" } }).unwrap());
        assert!(matches(&p, &doc! { "name": { "$regex": "(" } }).is_err());
    }

    #[test]
    fn test_unknown_operator_is_error() {
        assert!(matches(&person(), &doc! { "age": { "$near": 1 } }).is_err());
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(sort_order(None, Some(&Bson::Int32(1))), Ordering::Less);
        assert_eq!(sort_order(Some(&Bson::Int32(2)), Some(&Bson::Double(1.5))), Ordering::Greater);
    }
}
