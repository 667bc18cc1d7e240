use std::collections::HashMap;

use trialgate_model::Outcome;

use crate::structure::RowData;
use crate::{IssueContainer, ValidationIssue};

/// Cross-record checks over shape-complete rows: date ordering,
/// duplicate detection and outcome membership. Rows whose dates did
/// not parse are skipped by the date-order rule; the format issue is
/// already on record.
pub fn validate_semantic(rows: &[RowData], issues: &mut IssueContainer) {
    let mut seen: HashMap<(String, String, String, String), u64> = HashMap::new();

    for row in rows {
        if let (Some(start), Some(end)) = (row.start_date, row.end_date) {
            if end < start {
                issues.push(ValidationIssue::date_order_violation(
                    row.row_number,
                    &start.to_string(),
                    &end.to_string(),
                ));
            }
        }

        let key = (
            row.patient_id.trim().to_string(),
            row.trial_code.trim().to_string(),
            row.drug_code.trim().to_string(),
            row.start_date_raw.trim().to_string(),
        );
        if let Some(prev_row) = seen.get(&key) {
            issues.push(ValidationIssue::duplicate_record(row.row_number, *prev_row));
        } else {
            seen.insert(key, row.row_number);
        }

        let outcome = row.outcome_raw.as_str();
        if !outcome.trim().is_empty() && Outcome::parse(outcome).is_err() {
            issues.push(ValidationIssue::invalid_outcome(row.row_number, outcome));
        }
    }
}
