//! `#[schema("...")]` constraint strings

/// Constraints declared on one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTag {
    pub required: bool,
    pub unique: bool,
    pub index: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Parse a comma-separated constraint list such as `"required,unique,min=2,max=100"`
///
/// Unknown tokens are ignored and a repeated token overrides the earlier one.
/// A bound with no leading integer is left unset.
pub fn parse_schema_tag(tag: &str) -> SchemaTag {
    let mut parsed = SchemaTag::default();

    for token in tag.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => match key.trim() {
                "min" => parsed.min = parse_bound(value),
                "max" => parsed.max = parse_bound(value),
                _ => {}
            },
            None => match token {
                "required" => parsed.required = true,
                "unique" => parsed.unique = true,
                "index" => parsed.index = true,
                _ => {}
            },
        }
    }

    parsed.index |= parsed.unique;
    parsed
}

fn parse_bound(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits_start = usize::from(text.starts_with(['-', '+']));
    let digits_len = text[digits_start..].bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    text[..digits_start + digits_len].parse().ok()
}
