// Reading the parts of #[serde(...)] that change where a field is stored

use syn::meta::ParseNestedMeta;
use syn::{Attribute, LitStr, Token};

#[derive(Debug, Default, PartialEq)]
pub struct SerdeField {
    pub rename: Option<String>,
    pub flatten: bool,
    pub skipped: bool,
}

pub fn parse_field(attrs: &[Attribute]) -> syn::Result<SerdeField> {
    let mut field = SerdeField::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if let Some(name) = parse_rename(&meta)? {
                    field.rename = Some(name);
                }
            } else if meta.path.is_ident("flatten") {
                field.flatten = true;
            } else if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_serializing")
                || meta.path.is_ident("skip_deserializing")
            {
                field.skipped = true;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(field)
}

/// `#[serde(rename_all = "...")]` on the container, serialize side
pub fn parse_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if let Some(r) = parse_rename(&meta)? {
                    rule = Some(r);
                }
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(rule)
}

/// `rename = "x"` or `rename(serialize = "x", deserialize = "y")`
fn parse_rename(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }

    let mut serialize = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            let lit: LitStr = inner.value()?.parse()?;
            serialize = Some(lit.value());
        } else {
            skip_meta(&inner)?;
        }
        Ok(())
    })?;
    Ok(serialize)
}

fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(skip_meta_owned)?;
    }
    Ok(())
}

fn skip_meta_owned(meta: ParseNestedMeta) -> syn::Result<()> {
    skip_meta(&meta)
}

/// Apply a serde `rename_all` rule to a snake_case field name
pub fn apply_rename_all(rule: &str, field: &str) -> syn::Result<String> {
    let words = || field.split('_').filter(|w| !w.is_empty());
    let capitalize = |w: &str| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    };

    let renamed = match rule {
        "lowercase" | "snake_case" => field.to_ascii_lowercase(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => words().map(capitalize).collect(),
        "camelCase" => {
            let pascal: String = words().map(capitalize).collect();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        }
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_ascii_uppercase(),
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported rename_all rule: {}", other),
            ))
        }
    };
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_field_attributes() {
        let field: syn::Field = parse_quote! {
            #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
            pub id: Option<String>
        };
        let parsed = parse_field(&field.attrs).unwrap();
        assert_eq!(parsed.rename.as_deref(), Some("_id"));
        assert!(!parsed.skipped);
        assert!(!parsed.flatten);
    }

    #[test]
    fn test_parse_nested_rename_and_flags() {
        let field: syn::Field = parse_quote! {
            #[serde(rename(serialize = "out", deserialize = "in"))]
            #[serde(flatten, with = "some::module")]
            pub extra: Extra
        };
        let parsed = parse_field(&field.attrs).unwrap();
        assert_eq!(parsed.rename.as_deref(), Some("out"));
        assert!(parsed.flatten);

        let skipped: syn::Field = parse_quote! {
            #[serde(skip)]
            cache: Vec<u8>
        };
        assert!(parse_field(&skipped.attrs).unwrap().skipped);
    }

    #[test]
    fn test_rename_all_rules() {
        assert_eq!(apply_rename_all("camelCase", "created_at").unwrap(), "createdAt");
        assert_eq!(apply_rename_all("PascalCase", "created_at").unwrap(), "CreatedAt");
        assert_eq!(apply_rename_all("SCREAMING-KEBAB-CASE", "a_b").unwrap(), "A-B");
        assert!(apply_rename_all("Title Case", "a").is_err());
    }
}
