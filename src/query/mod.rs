//! Typed Lucene query construction
//!
//! Turns structured search parameters into a validated query expression for
//! the enriched citation API. Invalid optional parameters degrade to
//! warnings rather than errors; the only hard failure is a query with no
//! surviving criteria at all, which policy forbids sending upstream.

pub mod fields;
mod validate;

pub use validate::validate_criteria;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::QueryConfig;
use crate::{Error, Result};

/// Earliest office action date with data in the remote service.
///
/// Earlier dates are legal in queries but can only return empty results, so
/// the builder attaches an advisory warning.
pub const DATA_START_DATE: &str = "2017-10-01";

static ALLOWED_VALUE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[A-Za-z0-9 .,_\-:*?"\[\]]+$"#).unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Structured search parameters, one request's worth.
///
/// All convenience parameters are optional; `criteria` carries raw Lucene
/// for callers that want full expressiveness. At least one of them has to
/// survive validation or [`build_query`] fails with [`Error::NoCriteria`].
#[derive(Debug, Clone, Default)]
pub struct QueryParameters {
    /// Raw Lucene criteria, combined with the convenience parameters via AND
    pub criteria: String,
    /// Applicant name (phrase-matched)
    pub applicant_name: Option<String>,
    /// Patent application number
    pub application_number: Option<String>,
    /// Publication number of a granted patent
    pub patent_number: Option<String>,
    /// Technology center
    pub tech_center: Option<String>,
    /// Group art unit number
    pub art_unit: Option<String>,
    /// Office action decision type code
    pub decision_type: Option<String>,
    /// Citation category code
    pub category_code: Option<String>,
    /// Inclusive range start, `YYYY-MM-DD`
    pub date_start: Option<String>,
    /// Inclusive range end, `YYYY-MM-DD`
    pub date_end: Option<String>,
    /// Filter on examiner-cited references; `None` means unspecified
    pub examiner_cited: Option<bool>,
}

/// Result of query construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuildResult {
    /// The assembled Lucene query
    pub query: String,
    /// Normalized value of every parameter that contributed to `query`
    pub params_used: BTreeMap<String, String>,
    /// One entry per dropped or advisory parameter, in validation order
    pub warnings: Vec<String>,
}

/// Build a query with the default limits.
pub fn build_query(params: &QueryParameters) -> Result<QueryBuildResult> {
    build_query_with_limits(params, &QueryConfig::default())
}

/// Build a query from structured parameters.
///
/// Validation runs in a fixed order (criteria, identifiers, classification,
/// date range, boolean flags) so warning ordering is reproducible. Reserved
/// Lucene characters inside accepted values are emitted verbatim: the field
/// clauses this builder produces rely on `:`/`"`/`[`/`]`/`-` as syntax, and
/// escaping them would corrupt the query.
pub fn build_query_with_limits(
    params: &QueryParameters,
    limits: &QueryConfig,
) -> Result<QueryBuildResult> {
    let mut parts: Vec<String> = Vec::new();
    let mut params_used = BTreeMap::new();
    let mut warnings = Vec::new();

    // Free-text criteria first
    let criteria = params.criteria.trim();
    if !criteria.is_empty() {
        match validate_criteria(criteria, limits) {
            Ok(()) => {
                parts.push(format!("({criteria})"));
                params_used.insert("base_criteria".to_string(), criteria.to_string());
            }
            Err(reason) => warnings.push(format!("criteria dropped: {reason}")),
        }
    }

    // Identifiers
    if let Some(name) =
        validate_string_param(params.applicant_name.as_deref(), "applicant_name", 200, &mut warnings)
    {
        parts.push(format!("{}:\"{name}\"", fields::FIRST_APPLICANT_NAME));
        params_used.insert("applicant_name".to_string(), name);
    }
    if let Some(number) = validate_string_param(
        params.application_number.as_deref(),
        "application_number",
        20,
        &mut warnings,
    ) {
        parts.push(format!("{}:{number}", fields::APPLICATION_NUMBER));
        params_used.insert("application_number".to_string(), number);
    }
    if let Some(number) =
        validate_string_param(params.patent_number.as_deref(), "patent_number", 15, &mut warnings)
    {
        parts.push(format!("{}:{number}", fields::PUBLICATION_NUMBER));
        params_used.insert("patent_number".to_string(), number);
    }

    // Classification
    if let Some(tc) =
        validate_string_param(params.tech_center.as_deref(), "tech_center", 10, &mut warnings)
    {
        parts.push(format!("{}:{tc}", fields::TECH_CENTER));
        params_used.insert("tech_center".to_string(), tc);
    }
    if let Some(unit) =
        validate_string_param(params.art_unit.as_deref(), "art_unit", 10, &mut warnings)
    {
        parts.push(format!("{}:{unit}", fields::GROUP_ART_UNIT));
        params_used.insert("art_unit".to_string(), unit);
    }
    if let Some(dt) =
        validate_string_param(params.decision_type.as_deref(), "decision_type", 50, &mut warnings)
    {
        parts.push(format!("{}:{dt}", fields::DECISION_TYPE));
        params_used.insert("decision_type".to_string(), dt);
    }
    if let Some(code) =
        validate_string_param(params.category_code.as_deref(), "category_code", 10, &mut warnings)
    {
        parts.push(format!("{}:{code}", fields::CITATION_CATEGORY));
        params_used.insert("category_code".to_string(), code);
    }

    // Date range: one-sided ranges are legal, inverted ranges are not
    let start = validate_date(params.date_start.as_deref(), "date_start", &mut warnings);
    let end = validate_date(params.date_end.as_deref(), "date_end", &mut warnings);
    match (start, end) {
        (Some((start_str, start_date)), Some((end_str, end_date))) => {
            if start_date > end_date {
                warnings.push(format!(
                    "date range dropped: start {start_str} is after end {end_str}"
                ));
            } else {
                push_date_range(&mut parts, &mut params_used, &start_str, &end_str);
            }
        }
        (Some((start_str, _)), None) => {
            push_date_range(&mut parts, &mut params_used, &start_str, "*");
        }
        (None, Some((end_str, _))) => {
            push_date_range(&mut parts, &mut params_used, "*", &end_str);
        }
        (None, None) => {}
    }

    // Boolean flags: absent means unspecified, distinct from explicit false
    if let Some(cited) = params.examiner_cited {
        parts.push(format!("{}:{cited}", fields::EXAMINER_CITED));
        params_used.insert("examiner_cited".to_string(), cited.to_string());
    }

    if parts.is_empty() {
        return Err(Error::NoCriteria);
    }

    Ok(QueryBuildResult {
        query: parts.join(" AND "),
        params_used,
        warnings,
    })
}

fn push_date_range(
    parts: &mut Vec<String>,
    params_used: &mut BTreeMap<String, String>,
    start: &str,
    end: &str,
) {
    parts.push(format!("{}:[{start} TO {end}]", fields::OFFICE_ACTION_DATE));
    params_used.insert("date_range".to_string(), format!("{start} TO {end}"));
}

/// Trim and bound-check an optional string parameter.
///
/// Empty-after-trim drops silently (optional fields are expected to be
/// absent); over-length or disallowed characters drop with a warning.
fn validate_string_param(
    value: Option<&str>,
    field: &str,
    max_length: usize,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let clean = value?.trim();
    if clean.is_empty() {
        return None;
    }
    if clean.len() > max_length {
        warnings.push(format!(
            "{field} dropped: exceeds {max_length} characters"
        ));
        return None;
    }
    if !ALLOWED_VALUE_CHARS.is_match(clean) {
        warnings.push(format!("{field} dropped: contains unsupported characters"));
        return None;
    }
    Some(clean.to_string())
}

/// Validate an optional `YYYY-MM-DD` date parameter.
///
/// Returns the normalized string together with the parsed date so the
/// caller can order-check a two-sided range. Dates before the remote
/// service's data window warn but still contribute to the query.
fn validate_date(
    value: Option<&str>,
    field: &str,
    warnings: &mut Vec<String>,
) -> Option<(String, NaiveDate)> {
    let clean = value?.trim();
    if clean.is_empty() {
        return None;
    }
    if !ISO_DATE.is_match(clean) {
        warnings.push(format!("{field} dropped: date must be in YYYY-MM-DD format"));
        return None;
    }
    let Ok(date) = NaiveDate::parse_from_str(clean, "%Y-%m-%d") else {
        warnings.push(format!("{field} dropped: not a valid calendar date"));
        return None;
    };

    let data_start = NaiveDate::parse_from_str(DATA_START_DATE, "%Y-%m-%d")
        .unwrap_or(NaiveDate::MIN);
    if date < data_start {
        warnings.push(format!(
            "office action dates before {DATA_START_DATE} are not available; {clean} may return no results"
        ));
    }

    Some((clean.to_string(), date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_field_clause() {
        let result = build_query(&QueryParameters {
            tech_center: Some("2100".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.query, "techCenter:2100");
        assert_eq!(result.params_used["tech_center"], "2100");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn params_used_mirrors_the_query() {
        let result = build_query(&QueryParameters {
            criteria: "citationCategoryCode:X".to_string(),
            tech_center: Some("2100".to_string()),
            art_unit: Some(" 2128 ".to_string()),
            ..Default::default()
        })
        .unwrap();

        for value in result.params_used.values() {
            assert!(
                result.query.contains(value),
                "{value} missing from {}",
                result.query
            );
        }
        assert_eq!(result.params_used["art_unit"], "2128");
    }

    #[test]
    fn empty_parameters_fail_with_no_criteria() {
        assert!(matches!(
            build_query(&QueryParameters::default()),
            Err(Error::NoCriteria)
        ));
    }

    #[test]
    fn whitespace_only_values_drop_silently() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            applicant_name: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(result.warnings.is_empty());
        assert!(!result.params_used.contains_key("applicant_name"));
    }

    #[test]
    fn oversized_value_drops_with_warning() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            application_number: Some("1".repeat(21)),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("application_number dropped"));
        assert!(!result.params_used.contains_key("application_number"));
    }

    #[test]
    fn disallowed_characters_drop_with_warning() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            applicant_name: Some("Acme <Corp>".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("applicant_name"));
    }

    #[test]
    fn inverted_date_range_drops_both_sides_with_one_warning() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            date_start: Some("2024-06-01".to_string()),
            date_end: Some("2023-01-01".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("start 2024-06-01 is after end 2023-01-01"));
        assert!(!result.params_used.contains_key("date_range"));
        assert!(!result.query.contains("officeActionDate"));
    }

    #[test]
    fn one_sided_ranges_use_open_bound() {
        let result = build_query(&QueryParameters {
            date_start: Some("2023-01-01".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.query, "officeActionDate:[2023-01-01 TO *]");

        let result = build_query(&QueryParameters {
            date_end: Some("2023-12-31".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.query, "officeActionDate:[* TO 2023-12-31]");
        assert_eq!(result.params_used["date_range"], "* TO 2023-12-31");
    }

    #[test]
    fn pre_window_start_date_warns_but_still_contributes() {
        let result = build_query(&QueryParameters {
            date_start: Some("2015-01-01".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.query, "officeActionDate:[2015-01-01 TO *]");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("2017-10-01"));
    }

    #[test]
    fn malformed_date_drops_with_warning() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            date_start: Some("01/02/2023".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("YYYY-MM-DD"));
    }

    #[test]
    fn impossible_calendar_date_drops_with_warning() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            date_end: Some("2023-02-30".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("date_end"));
    }

    #[test]
    fn examiner_cited_false_is_distinct_from_absent() {
        let result = build_query(&QueryParameters {
            examiner_cited: Some(false),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.query, "examinerCitedReferenceIndicator:false");
        assert_eq!(result.params_used["examiner_cited"], "false");

        let absent = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            examiner_cited: None,
            ..Default::default()
        })
        .unwrap();
        assert!(!absent.params_used.contains_key("examiner_cited"));
        assert!(!absent.query.contains("examinerCited"));
    }

    #[test]
    fn warning_order_follows_validation_order() {
        let result = build_query(&QueryParameters {
            criteria: "techCenter:2100".to_string(),
            applicant_name: Some("bad\u{7f}name".to_string()),
            tech_center: Some("x".repeat(11)),
            date_start: Some("not-a-date".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].contains("applicant_name"));
        assert!(result.warnings[1].contains("tech_center"));
        assert!(result.warnings[2].contains("date_start"));
    }

    #[test]
    fn clauses_join_with_and() {
        let result = build_query(&QueryParameters {
            tech_center: Some("2100".to_string()),
            art_unit: Some("2128".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.query, "techCenter:2100 AND groupArtUnitNumber:2128");
    }
}
