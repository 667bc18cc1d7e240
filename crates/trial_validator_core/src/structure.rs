use csv::ReaderBuilder;

use trialgate_model::{Dosage, Outcome, TrialDate, TrialRecord};

use crate::{IssueContainer, ValidationIssue};

pub const REQUIRED_HEADER: &[&str] = &[
    "PatientID",
    "TrialCode",
    "DrugCode",
    "Dosage_mg",
    "StartDate",
    "EndDate",
    "Outcome",
    "SideEffects",
    "Analyst",
];

/// One shape-complete data row, raw fields plus whatever parsed.
/// Rows with the wrong field count never make it here.
#[derive(Debug, Clone)]
pub struct RowData {
    pub row_number: u64,
    pub patient_id: String,
    pub trial_code: String,
    pub drug_code: String,
    pub dosage: Option<Dosage>,
    pub start_date_raw: String,
    pub end_date_raw: String,
    pub start_date: Option<TrialDate>,
    pub end_date: Option<TrialDate>,
    pub outcome_raw: String,
    pub side_effects: String,
    pub analyst: String,
}

impl RowData {
    /// The fully typed record, available only when every field
    /// parsed. Rows that fail any type or membership rule yield
    /// `None`.
    pub fn to_record(&self) -> Option<TrialRecord> {
        Some(TrialRecord {
            patient_id: self.patient_id.clone(),
            trial_code: self.trial_code.clone(),
            drug_code: self.drug_code.clone(),
            dosage_mg: self.dosage?,
            start_date: self.start_date?,
            end_date: self.end_date?,
            outcome: Outcome::parse(&self.outcome_raw).ok()?,
            side_effects: self.side_effects.clone(),
            analyst: self.analyst.clone(),
        })
    }
}

/// Checks header, field counts, required values and per-field types.
/// Each rule is independent; a header mismatch does not stop the row
/// scan. Returns the shape-complete rows for the semantic stage.
pub fn validate_structure(data: &[u8], issues: &mut IssueContainer) -> Vec<RowData> {
    let data = strip_utf8_bom(data);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(_) => {
            issues.push(ValidationIssue::missing_header(""));
            return Vec::new();
        }
    };

    if headers.is_empty() || headers.iter().all(|value| value.is_empty()) {
        issues.push(ValidationIssue::missing_header(""));
        return Vec::new();
    }
    if !headers.iter().eq(REQUIRED_HEADER.iter().copied()) {
        let actual: Vec<&str> = headers.iter().collect();
        issues.push(ValidationIssue::missing_header(&actual.join(",")));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(_) => continue,
        };
        let row_number = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(index as u64 + 2);

        if record.len() != REQUIRED_HEADER.len() {
            issues.push(ValidationIssue::wrong_field_count(
                row_number,
                REQUIRED_HEADER.len(),
                record.len(),
            ));
            continue;
        }

        let field = |col: usize| record.get(col).unwrap_or("").to_string();
        let mut row = RowData {
            row_number,
            patient_id: field(0),
            trial_code: field(1),
            drug_code: field(2),
            dosage: None,
            start_date_raw: field(4),
            end_date_raw: field(5),
            start_date: None,
            end_date: None,
            outcome_raw: field(6),
            side_effects: field(7),
            analyst: field(8),
        };

        for (col, name) in REQUIRED_HEADER.iter().enumerate() {
            if record.get(col).unwrap_or("").trim().is_empty() {
                issues.push(ValidationIssue::missing_value(*name, row_number));
            }
        }

        let dosage_raw = record.get(3).unwrap_or("");
        if !dosage_raw.trim().is_empty() {
            match Dosage::parse(dosage_raw) {
                Ok(dosage) => row.dosage = Some(dosage),
                Err(_) => issues.push(ValidationIssue::bad_type("Dosage_mg", row_number, dosage_raw)),
            }
        }

        if !row.start_date_raw.trim().is_empty() {
            match TrialDate::parse(&row.start_date_raw) {
                Ok(date) => row.start_date = Some(date),
                Err(_) => issues.push(ValidationIssue::bad_date_format(
                    "StartDate",
                    row_number,
                    &row.start_date_raw,
                )),
            }
        }
        if !row.end_date_raw.trim().is_empty() {
            match TrialDate::parse(&row.end_date_raw) {
                Ok(date) => row.end_date = Some(date),
                Err(_) => issues.push(ValidationIssue::bad_date_format(
                    "EndDate",
                    row_number,
                    &row.end_date_raw,
                )),
            }
        }

        rows.push(row);
    }

    rows
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}
