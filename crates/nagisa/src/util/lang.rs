use std::sync::LazyLock;

use regex::Regex;

// Well-formedness only: a 2-3 letter primary subtag followed by short
// alphanumeric subtags. No registry lookup is performed.
static LANGUAGE_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap());

pub fn is_language_tag_valid(value: &str) -> bool {
    LANGUAGE_TAG_REGEX.is_match(value)
}

/// A usable language candidate is a well-formed tag that is not the
/// "undetermined" marker.
pub fn is_language_usable(value: &str) -> bool {
    !value.starts_with("und") && is_language_tag_valid(value)
}
