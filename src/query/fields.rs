//! Field name constants for the USPTO Enriched Citation API
//!
//! Names match the remote schema exactly; queries are built from these
//! constants rather than string literals so a schema rename is a one-line
//! change.

/// Patent application number
pub const APPLICATION_NUMBER: &str = "patentApplicationNumber";
/// Publication number of the granted patent
pub const PUBLICATION_NUMBER: &str = "publicationNumber";
/// Identifier of the cited document
pub const CITED_DOCUMENT_ID: &str = "citedDocumentIdentifier";

/// Technology center (e.g. 2100)
pub const TECH_CENTER: &str = "techCenter";
/// Group art unit number (e.g. 2128)
pub const GROUP_ART_UNIT: &str = "groupArtUnitNumber";
/// Work group number
pub const WORK_GROUP: &str = "workGroupNumber";

/// Citation category code (X, Y, A, ...)
pub const CITATION_CATEGORY: &str = "citationCategoryCode";
/// Office action decision type code
pub const DECISION_TYPE: &str = "decisionTypeCode";
/// Whether the examiner cited the reference
pub const EXAMINER_CITED: &str = "examinerCitedReferenceIndicator";

/// Office action date
pub const OFFICE_ACTION_DATE: &str = "officeActionDate";

/// First applicant name
pub const FIRST_APPLICANT_NAME: &str = "firstApplicantName";

/// Fields accepted in raw criteria expressions.
///
/// Anything outside this list is rejected by
/// [`validate_criteria`](crate::query::validate_criteria) before the query
/// reaches the remote service.
pub const SEARCHABLE_FIELDS: &[&str] = &[
    APPLICATION_NUMBER,
    PUBLICATION_NUMBER,
    GROUP_ART_UNIT,
    CITED_DOCUMENT_ID,
    CITATION_CATEGORY,
    TECH_CENTER,
    OFFICE_ACTION_DATE,
    EXAMINER_CITED,
    DECISION_TYPE,
    FIRST_APPLICANT_NAME,
    "passageLocationText",
    "officeActionCategory",
    "relatedClaimNumberText",
    "nplIndicator",
    WORK_GROUP,
    "kindCode",
    "countryCode",
    "qualitySummaryText",
    "inventorNameText",
    "applicantCitedExaminerReferenceIndicator",
    "createDateTime",
    "createUserIdentifier",
    "obsoleteDocumentIdentifier",
    "id",
];

/// Boolean/range operators legal in raw criteria
pub const OPERATORS: &[&str] = &["AND", "OR", "NOT", "TO"];

/// Whether `name` is a known searchable field
#[must_use]
pub fn is_searchable(name: &str) -> bool {
    SEARCHABLE_FIELDS.contains(&name)
}

/// Whether `word` is a query operator (case-sensitive, Lucene convention)
#[must_use]
pub fn is_operator(word: &str) -> bool {
    OPERATORS.contains(&word)
}
