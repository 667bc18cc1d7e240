use crate::{IssueCode, ValidationIssue};

pub const FILENAME_PREFIX: &str = "CLINICALDATA_";
pub const FILENAME_EXTENSION: &str = ".CSV";
const TIMESTAMP_DIGITS: usize = 14;

/// Case handling for the filename convention. `Strict` requires the
/// exact-case `CLINICALDATA_` prefix and `.CSV` extension;
/// `Insensitive` accepts any casing of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CasePolicy {
    #[default]
    Strict,
    Insensitive,
}

/// Checks a candidate filename against
/// `CLINICALDATA_<YYYYMMDDHHMMSS>.CSV`. Returns `None` when the name
/// conforms, otherwise exactly one issue naming the deviation.
pub fn validate_filename(name: &str, policy: CasePolicy) -> Option<ValidationIssue> {
    if name.is_empty() {
        return Some(ValidationIssue::invalid_filename("filename is empty"));
    }

    let Some(rest) = strip_prefix(name, FILENAME_PREFIX, policy) else {
        return Some(deviation(name, "missing CLINICALDATA_ prefix"));
    };
    let Some(timestamp) = strip_suffix(rest, FILENAME_EXTENSION, policy) else {
        return Some(deviation(name, "missing .CSV extension"));
    };

    if timestamp.len() != TIMESTAMP_DIGITS {
        return Some(deviation(
            name,
            &format!(
                "timestamp must be {TIMESTAMP_DIGITS} digits, got {}",
                timestamp.len()
            ),
        ));
    }
    if !timestamp.chars().all(|ch| ch.is_ascii_digit()) {
        return Some(deviation(name, "timestamp must be numeric"));
    }

    None
}

fn deviation(name: &str, reason: &str) -> ValidationIssue {
    ValidationIssue::new(
        IssueCode::InvalidFilename,
        format!("filename {name:?} does not match CLINICALDATA_<YYYYMMDDHHMMSS>.CSV: {reason}"),
    )
}

fn strip_prefix<'a>(name: &'a str, prefix: &str, policy: CasePolicy) -> Option<&'a str> {
    match policy {
        CasePolicy::Strict => name.strip_prefix(prefix),
        CasePolicy::Insensitive => match (name.get(..prefix.len()), name.get(prefix.len()..)) {
            (Some(head), Some(tail)) if head.eq_ignore_ascii_case(prefix) => Some(tail),
            _ => None,
        },
    }
}

fn strip_suffix<'a>(rest: &'a str, suffix: &str, policy: CasePolicy) -> Option<&'a str> {
    match policy {
        CasePolicy::Strict => rest.strip_suffix(suffix),
        CasePolicy::Insensitive => {
            let split = rest.len().checked_sub(suffix.len())?;
            match (rest.get(..split), rest.get(split..)) {
                (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(suffix) => Some(head),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_conforming_name() {
        assert!(validate_filename("CLINICALDATA_20250115120000.CSV", CasePolicy::Strict).is_none());
    }

    #[test]
    fn rejects_wrong_prefix() {
        let issue = validate_filename("TRIALDATA_20250115120000.CSV", CasePolicy::Strict).unwrap();
        assert_eq!(issue.code, IssueCode::InvalidFilename);
        assert!(issue.message.contains("prefix"));
    }

    #[test]
    fn rejects_wrong_extension() {
        let issue = validate_filename("CLINICALDATA_20250115120000.TXT", CasePolicy::Strict).unwrap();
        assert!(issue.message.contains("extension"));
    }

    #[test]
    fn rejects_short_timestamp() {
        let issue = validate_filename("CLINICALDATA_2025.CSV", CasePolicy::Strict).unwrap();
        assert!(issue.message.contains("14 digits"));
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        let issue = validate_filename("CLINICALDATA_2025011512000A.CSV", CasePolicy::Strict).unwrap();
        assert!(issue.message.contains("numeric"));
    }

    #[test]
    fn rejects_extra_characters() {
        assert!(validate_filename("CLINICALDATA_20250115120000_v2.CSV", CasePolicy::Strict).is_some());
        assert!(validate_filename("XCLINICALDATA_20250115120000.CSV", CasePolicy::Strict).is_some());
    }

    #[test]
    fn rejects_empty_name() {
        let issue = validate_filename("", CasePolicy::Strict).unwrap();
        assert_eq!(issue.code, IssueCode::InvalidFilename);
    }

    #[test]
    fn strict_policy_rejects_lowercase() {
        assert!(validate_filename("clinicaldata_20250115120000.csv", CasePolicy::Strict).is_some());
        assert!(validate_filename("CLINICALDATA_20250115120000.csv", CasePolicy::Strict).is_some());
    }

    #[test]
    fn insensitive_policy_accepts_any_case() {
        for name in [
            "clinicaldata_20250115120000.csv",
            "ClinicalData_20250115120000.Csv",
            "CLINICALDATA_20250115120000.CSV",
        ] {
            assert!(
                validate_filename(name, CasePolicy::Insensitive).is_none(),
                "{name} should be accepted"
            );
        }
    }
}
