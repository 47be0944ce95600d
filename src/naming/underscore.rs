//! Lower-snake-case conversion used by the queue naming convention.

use std::sync::LazyLock;

use regex::Regex;

// `HTMLParser` -> `HTML_Parser`
static UPPER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Lu}+)(\p{Lu}\p{Ll})").expect("static regex"));

// `orderCreated` -> `order_Created`, `v2Order` -> `v2_Order`
static LOWER_TO_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{Ll}\d])(\p{Lu})").expect("static regex"));

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]").expect("static regex"));

/// Convert an identifier to lower snake case.
///
/// Existing underscores are kept as-is, so the function is idempotent:
/// `underscore(underscore(s)) == underscore(s)`.
pub fn underscore(input: &str) -> String {
    let step = UPPER_RUN.replace_all(input, "${1}_${2}");
    let step = LOWER_TO_UPPER.replace_all(&step, "${1}_${2}");
    let step = SEPARATORS.replace_all(&step, "_");
    step.to_lowercase()
}
