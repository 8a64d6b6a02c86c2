//! Small SQL helpers shared by the SQLite adapters.

use uuid::Uuid;

/// Parses a UUID column value, naming the column on failure.
pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid value `{value}` in {column}"))
}

/// Builds a `LIKE` pattern matching `term` anywhere, escaping wildcards with `\`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, parse_uuid};

    #[test]
    fn like_pattern_escapes_wildcards_and_lowercases() {
        assert_eq!(like_pattern("Ab"), "%ab%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn parse_uuid_names_column_on_failure() {
        let err = parse_uuid("nope", "contacts.uuid").unwrap_err();
        assert!(err.contains("contacts.uuid"));
    }
}
