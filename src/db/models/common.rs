//! Helpers shared across models.

use sqlx::{QueryBuilder, Sqlite};

/// Start a query of the form `<select> WHERE <column> IN (?, ?, ...)`.
///
/// Callers append any trailing clauses (ordering, extra filters) before
/// building. `ids` must not be empty; SQLite rejects `IN ()`.
pub(crate) fn select_where_in<'a>(
    select: &str,
    column: &str,
    ids: &'a [String],
) -> QueryBuilder<'a, Sqlite> {
    let mut query = QueryBuilder::new(format!("{} WHERE {} IN (", select, column));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    query
}

/// Substring pattern for `LIKE ? ESCAPE '\'`; backslash, `%` and `_` in
/// `text` match literally
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Distinct values in first-seen order
pub(crate) fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Normalize an enum-ish label: lowercase with separators removed, so
/// "ForSale", "for_sale" and "for-sale" all compare equal.
pub(crate) fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_keeps_first_seen_order() {
        let ids = unique_ids(["b", "a", "b", "c", "a"]);
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("ForSale"), "forsale");
        assert_eq!(normalize_label("for_sale"), "forsale");
        assert_eq!(normalize_label("FOR-SALE"), "forsale");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("miami"), "%miami%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_select_where_in_sql() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let query = select_where_in("SELECT * FROM users", "id", &ids);
        assert_eq!(query.sql(), "SELECT * FROM users WHERE id IN (?, ?)");
    }
}
