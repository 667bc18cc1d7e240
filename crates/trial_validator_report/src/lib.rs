//! Caller-facing reports built from validation outcomes: a stable
//! JSON form for archival tooling and a human-readable rendering of
//! the rejection reasons.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use trialgate_core::{ValidationIssue, ValidationOutcome};

/// Complete, immutable result of validating one file. `is_valid` is
/// true exactly when `issues` is empty; the constructor keeps the two
/// consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub file_name: String,
    pub is_valid: bool,
    pub records: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_outcome(outcome: ValidationOutcome) -> Self {
        let issues = outcome.issues.into_issues();
        Self {
            file_name: outcome.file_name,
            is_valid: issues.is_empty(),
            records: outcome.records,
            issues,
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P, pretty: bool) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
        .context("serialize validation report")?;
        fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
        Ok(())
    }

    /// Renders the report for a console or log viewer. A rejected
    /// file always shows at least one reason.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.is_valid {
            let _ = writeln!(
                out,
                "{}: VALID ({} record{})",
                self.file_name,
                self.records,
                if self.records == 1 { "" } else { "s" }
            );
            return out;
        }
        let _ = writeln!(
            out,
            "{}: INVALID ({} issue{})",
            self.file_name,
            self.issues.len(),
            if self.issues.len() == 1 { "" } else { "s" }
        );
        for issue in &self.issues {
            match issue.row {
                Some(row) => {
                    let _ = writeln!(out, "  row {row}: {}", issue.message);
                }
                None => {
                    let _ = writeln!(out, "  {}", issue.message);
                }
            }
        }
        out
    }
}
