use serde::{Deserialize, Serialize};

/// Closed set of rule violations a submission can be rejected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidFilename,
    MissingHeader,
    WrongFieldCount,
    BadType,
    BadDateFormat,
    DateOrderViolation,
    DuplicateRecord,
    InvalidOutcome,
    MissingValue,
    InternalError,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFilename => "invalid_filename",
            Self::MissingHeader => "missing_header",
            Self::WrongFieldCount => "wrong_field_count",
            Self::BadType => "bad_type",
            Self::BadDateFormat => "bad_date_format",
            Self::DateOrderViolation => "date_order_violation",
            Self::DuplicateRecord => "duplicate_record",
            Self::InvalidOutcome => "invalid_outcome",
            Self::MissingValue => "missing_value",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected rule violation. `row` is the physical CSV line number
/// (the header is line 1); `prev_row` is set only for duplicate
/// records and names the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_row: Option<u64>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            row: None,
            prev_row: None,
        }
    }

    pub fn invalid_filename(message: impl Into<String>) -> Self {
        Self::new(IssueCode::InvalidFilename, message)
    }

    pub fn missing_header(actual: &str) -> Self {
        let message = if actual.is_empty() {
            "file has no header row".to_string()
        } else {
            format!("header does not match expected columns, found: {actual}")
        };
        Self::new(IssueCode::MissingHeader, message)
    }

    pub fn wrong_field_count(row: u64, expected: usize, found: usize) -> Self {
        let mut issue = Self::new(
            IssueCode::WrongFieldCount,
            format!("expected {expected} fields, got {found}"),
        );
        issue.row = Some(row);
        issue
    }

    pub fn bad_type(field: impl Into<String>, row: u64, value: &str) -> Self {
        let field = field.into();
        let mut issue = Self::new(
            IssueCode::BadType,
            format!("{field} must be a positive integer, got: {value}"),
        );
        issue.field = Some(field);
        issue.row = Some(row);
        issue
    }

    pub fn bad_date_format(field: impl Into<String>, row: u64, value: &str) -> Self {
        let field = field.into();
        let mut issue = Self::new(
            IssueCode::BadDateFormat,
            format!("{field} must be a valid YYYY-MM-DD date, got: {value}"),
        );
        issue.field = Some(field);
        issue.row = Some(row);
        issue
    }

    pub fn date_order_violation(row: u64, start: &str, end: &str) -> Self {
        let mut issue = Self::new(
            IssueCode::DateOrderViolation,
            format!("EndDate {end} is before StartDate {start}"),
        );
        issue.row = Some(row);
        issue
    }

    pub fn duplicate_record(row: u64, prev_row: u64) -> Self {
        let mut issue = Self::new(
            IssueCode::DuplicateRecord,
            format!("duplicate of record at row {prev_row}"),
        );
        issue.row = Some(row);
        issue.prev_row = Some(prev_row);
        issue
    }

    pub fn invalid_outcome(row: u64, value: &str) -> Self {
        let mut issue = Self::new(
            IssueCode::InvalidOutcome,
            format!("Outcome must be Improved, No Change or Worsened, got: {value}"),
        );
        issue.field = Some("Outcome".to_string());
        issue.row = Some(row);
        issue
    }

    pub fn missing_value(field: impl Into<String>, row: u64) -> Self {
        let field = field.into();
        let mut issue = Self::new(IssueCode::MissingValue, format!("{field} must not be empty"));
        issue.field = Some(field);
        issue.row = Some(row);
        issue
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(IssueCode::InternalError, message)
    }
}

#[derive(Debug, Default)]
pub struct IssueContainer {
    issues: Vec<ValidationIssue>,
}

impl IssueContainer {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn merge(&mut self, other: IssueContainer) {
        self.issues.extend(other.issues);
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}
