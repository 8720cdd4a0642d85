//! Simon name grammar and hierarchy helpers.

/// The name of the root Simon.
pub const ROOT_SIMON_NAME: &str = "";

/// Delimiter between hierarchy levels in a Simon name.
pub const HIERARCHY_DELIMITER: char = '.';

/// Checks whether `name` matches the Simon name grammar `[-_\[\]A-Za-z0-9.,@$%()<>]+`.
///
/// The empty string (the root name) does not match; it is reserved.
///
/// # Example
///
/// ```
/// use simons::is_valid_name;
///
/// assert!(is_valid_name("app.db.query[users]"));
/// assert!(!is_valid_name("app db"));
/// assert!(!is_valid_name(""));
/// ```
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_valid_name_char)
}

pub(crate) fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '_' | '[' | ']' | '.' | ',' | '@' | '$' | '%' | '(' | ')' | '<' | '>'
        )
}

/// Name of the parent of `name` in the hierarchy.
///
/// Top-level names have the root as their parent.
pub(crate) fn parent_name(name: &str) -> &str {
    name.rfind(HIERARCHY_DELIMITER)
        .and_then(|ix| name.get(..ix))
        .unwrap_or(ROOT_SIMON_NAME)
}
