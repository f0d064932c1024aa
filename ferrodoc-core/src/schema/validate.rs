//! Document validation against a schema

use super::{FieldConstraint, Schema};
use crate::error::{Error, Result, Rule, ValidationErrors};
use crate::introspect::{as_f64, as_i64, is_zero, values_equal};
use crate::model_inspect::Inspectable;
use bson::Bson;

impl Schema {
    /// Validate a document instance
    ///
    /// With a custom validator installed, that validator alone decides. Otherwise
    /// every field constraint is checked and all violations are reported together.
    pub fn validate_document(&self, document: &dyn Inspectable) -> Result<()> {
        if let Some(validator) = self.validator() {
            return validator(document).map_err(|e| {
                Error::Validation(ValidationErrors::single(None, Rule::Validator, e.to_string()))
            });
        }
        self.check(document).into_result()
    }

    /// Run the built-in checks and collect every violation, in field-name order
    pub fn check(&self, document: &dyn Inspectable) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if !document.is_record() {
            errors.push(None, Rule::Document, "document must be a struct");
            return errors;
        }

        for (name, constraint) in self.fields() {
            match document.try_field_value(name) {
                Ok(value) => check_field(name, constraint, value, &mut errors),
                Err(e) => errors.push(
                    Some(name.clone()),
                    Rule::Type,
                    format!("field '{}' cannot be stored: {}", name, e),
                ),
            }
        }

        errors
    }
}

fn check_field(
    name: &str,
    constraint: &FieldConstraint,
    value: Option<Bson>,
    errors: &mut ValidationErrors,
) {
    let field = || Some(name.to_string());

    let value = match value {
        None => {
            if constraint.required {
                errors.push(
                    field(),
                    Rule::Required,
                    format!("required field '{}' not found in document", name),
                );
            }
            return;
        }
        Some(value) => value,
    };

    if constraint.required && is_zero(&value) {
        errors.push(field(), Rule::Required, format!("required field '{}' is empty", name));
    }

    // Absent optional values carry nothing further to check
    if value == Bson::Null {
        return;
    }

    if let Some((below, above)) = out_of_bounds(&value, constraint.min, constraint.max) {
        if let (true, Some(min)) = (below, constraint.min) {
            errors.push(
                field(),
                Rule::Min,
                format!(
                    "field '{}' value {} is less than minimum {}",
                    name,
                    display_number(&value),
                    min
                ),
            );
        }
        if let (true, Some(max)) = (above, constraint.max) {
            errors.push(
                field(),
                Rule::Max,
                format!(
                    "field '{}' value {} is greater than maximum {}",
                    name,
                    display_number(&value),
                    max
                ),
            );
        }
    }

    if !constraint.enum_values.is_empty()
        && !constraint.enum_values.iter().any(|allowed| values_equal(allowed, &value))
    {
        errors.push(
            field(),
            Rule::Enum,
            format!("field '{}' value is not in the allowed enum values", name),
        );
    }

    if let Some(predicate) = &constraint.validate {
        if !predicate(&value) {
            errors.push(field(), Rule::Custom, format!("field '{}' failed custom validation", name));
        }
    }
}

/// `(below min, above max)` for a numeric value, `None` otherwise
///
/// Integers compare exactly against the bounds; only doubles go through `f64`.
fn out_of_bounds(value: &Bson, min: Option<i64>, max: Option<i64>) -> Option<(bool, bool)> {
    if let Some(n) = as_i64(value) {
        return Some((min.is_some_and(|m| n < m), max.is_some_and(|m| n > m)));
    }
    let number = as_f64(value)?;
    Some((min.is_some_and(|m| number < m as f64), max.is_some_and(|m| number > m as f64)))
}

fn display_number(value: &Bson) -> String {
    match (as_i64(value), as_f64(value)) {
        (Some(n), _) => n.to_string(),
        (None, Some(f)) => format!("{:.6}", f),
        _ => value.to_string(),
    }
}
