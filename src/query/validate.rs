//! Validation of caller-supplied raw Lucene criteria
//!
//! Convenience parameters go through the per-field checks in
//! [`super::build_query`]; free-text criteria arrive as raw Lucene and get
//! the full structural treatment here: balance, nesting depth, field
//! allow-list, wildcard bounds, and an overall character allow-list.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::QueryConfig;

use super::fields;

static DANGEROUS_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script|javascript:|\\x[0-9a-f]{2}|\\u[0-9a-f]{4}|\$\{|`"#).unwrap()
});
static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+):").unwrap());
static EMPTY_FIELD_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+:(\s|$|AND\s|OR\s|NOT\s)").unwrap());
static LEADING_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(AND|OR|NOT)\s").unwrap());
static DANGLING_OPERATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(AND|OR)\s*$").unwrap());
static DANGLING_RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*TO\s*$").unwrap());
static ALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[a-zA-Z0-9:*?"()\[\]\-\s&|!.,_]+$"#).unwrap());
static RANGE_BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]+\]").unwrap());
static LEADING_WILDCARD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\s)\*").unwrap());

/// Validate a raw Lucene criteria expression.
///
/// Returns the reason for rejection; `Ok(())` means the expression is safe
/// to embed in an outbound query.
pub fn validate_criteria(criteria: &str, limits: &QueryConfig) -> Result<(), String> {
    let criteria = criteria.trim();
    if criteria.is_empty() {
        return Err("criteria cannot be empty".to_string());
    }

    if criteria.len() > limits.max_criteria_length {
        return Err(format!(
            "criteria too long (max {} characters)",
            limits.max_criteria_length
        ));
    }

    if DANGEROUS_PATTERNS.is_match(criteria) {
        return Err("criteria contains potentially dangerous patterns".to_string());
    }

    check_balance(criteria, limits.max_nesting_depth)?;

    if criteria.matches('"').count() % 2 != 0 {
        return Err("unbalanced quotes".to_string());
    }

    if EMPTY_FIELD_VALUE.is_match(criteria) {
        return Err("field queries must have non-empty values".to_string());
    }
    if LEADING_OPERATOR.is_match(criteria) {
        return Err("criteria cannot start with a boolean operator".to_string());
    }
    if DANGLING_OPERATOR.is_match(criteria) {
        return Err("incomplete boolean expression".to_string());
    }
    if DANGLING_RANGE.is_match(criteria) {
        return Err("incomplete range expression".to_string());
    }

    for capture in FIELD_NAME.captures_iter(criteria) {
        let name = &capture[1];
        if !fields::is_searchable(name) && !fields::is_operator(&name.to_uppercase()) {
            return Err(format!("unknown field name: {name}"));
        }
    }

    if !ALLOWED_CHARS.is_match(criteria) {
        return Err("criteria contains invalid characters".to_string());
    }

    let wildcards = criteria.matches('*').count() + criteria.matches('?').count();
    if wildcards > limits.max_wildcards {
        return Err(format!(
            "too many wildcards (max {})",
            limits.max_wildcards
        ));
    }

    // Leading wildcards force a full index scan remotely; ranges use `*` for
    // the open side legitimately, so strip range bodies before checking.
    let without_ranges = RANGE_BODY.replace_all(criteria, "");
    if LEADING_WILDCARD.is_match(&without_ranges) {
        return Err("leading wildcards are not allowed".to_string());
    }

    Ok(())
}

/// Parenthesis/bracket balance and nesting-depth check in one pass.
fn check_balance(criteria: &str, max_depth: usize) -> Result<(), String> {
    let mut parens = 0i64;
    let mut brackets = 0i64;
    let max_depth = i64::try_from(max_depth).unwrap_or(i64::MAX);

    for c in criteria.chars() {
        match c {
            '(' => parens += 1,
            ')' => parens -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
        if parens > max_depth || brackets > max_depth {
            return Err(format!("nesting too deep (max {max_depth} levels)"));
        }
        if parens < 0 || brackets < 0 {
            return Err("unbalanced parentheses or brackets".to_string());
        }
    }

    if parens != 0 {
        return Err("unbalanced parentheses".to_string());
    }
    if brackets != 0 {
        return Err("unbalanced brackets".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> QueryConfig {
        QueryConfig::default()
    }

    #[test]
    fn accepts_documented_query_shapes() {
        let valid = [
            "groupArtUnitNumber:2854",
            "officeActionDate:[2017-10-01 TO *]",
            "citationCategoryCode:X AND techCenter:2100",
            "(citationCategoryCode:X OR citationCategoryCode:Y)",
            "techCenter:2100 NOT groupArtUnitNumber:1600",
            "citedDocumentIdentifier:US*",
            r#"firstApplicantName:"Tesla Motors""#,
            "groupArtUnitNumber:2854 AND officeActionDate:[2023-01-01 TO 2023-12-31]",
        ];
        for q in valid {
            assert!(validate_criteria(q, &limits()).is_ok(), "rejected: {q}");
        }
    }

    #[test]
    fn rejects_empty_criteria() {
        assert!(validate_criteria("", &limits()).is_err());
        assert!(validate_criteria("   ", &limits()).is_err());
    }

    #[test]
    fn rejects_unbalanced_structures() {
        assert!(validate_criteria("(techCenter:2100", &limits()).is_err());
        assert!(validate_criteria("techCenter:2100)", &limits()).is_err());
        assert!(
            validate_criteria("officeActionDate:[2023-01-01 TO *", &limits()).is_err()
        );
        assert!(validate_criteria(r#"techCenter:"2100"#, &limits()).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = validate_criteria("secretField:42", &limits()).unwrap_err();
        assert!(err.contains("secretField"));
    }

    #[test]
    fn rejects_injection_patterns() {
        assert!(validate_criteria("techCenter:<script>", &limits()).is_err());
        assert!(validate_criteria("techCenter:${oops}", &limits()).is_err());
        assert!(validate_criteria("techCenter:`id`", &limits()).is_err());
    }

    #[test]
    fn rejects_dangling_operators_and_empty_values() {
        assert!(validate_criteria("AND techCenter:2100", &limits()).is_err());
        assert!(validate_criteria("techCenter:2100 AND", &limits()).is_err());
        assert!(validate_criteria("techCenter: AND artUnit:1", &limits()).is_err());
    }

    #[test]
    fn bounds_wildcards() {
        let q = format!("citedDocumentIdentifier:{}", "*".repeat(11));
        assert!(validate_criteria(&q, &limits()).is_err());
    }

    #[test]
    fn rejects_leading_wildcard_outside_ranges() {
        assert!(validate_criteria("*2100", &limits()).is_err());
        // A `*` bounding a range is the open side, not a leading wildcard
        assert!(
            validate_criteria("officeActionDate:[* TO 2023-01-01]", &limits()).is_ok()
        );
    }

    #[test]
    fn bounds_nesting_depth() {
        let q = format!("{}techCenter:2100{}", "(".repeat(6), ")".repeat(6));
        assert!(validate_criteria(&q, &limits()).is_err());
    }
}
