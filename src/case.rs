//! Field naming: arbitrary column headers -> canonical snake_case names, plus camelCase request keys -> snake_case.

/// Canonical form of a column header or request key.
/// Lowercases, collapses every run of whitespace/punctuation into a single `_`
/// and strips leading/trailing separators.
/// e.g. "Part Name" -> "part_name", " Detail  Specification " -> "detail_specification", "NEW" -> "new"
pub fn canonical_field_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Placeholder name for a blank header at zero-based `index`.
pub fn placeholder_name(index: usize) -> String {
    format!("unnamed_{}", index)
}

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "currentStock" -> "current_stock", "partName" -> "part_name"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `s` mixes lower and upper case letters the way camelCase keys do.
pub fn looks_camel_case(s: &str) -> bool {
    s.chars().next().map(|c| c.is_lowercase()).unwrap_or(false) && s.chars().any(char::is_uppercase)
}
