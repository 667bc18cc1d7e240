use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error_log::ErrorLogger;
use crate::filename::{validate_filename, CasePolicy};
use crate::semantic::validate_semantic;
use crate::structure::validate_structure;
use crate::{IssueContainer, ValidationIssue};

/// Borrowed view of one candidate file, owned by the caller.
#[derive(Debug, Clone, Copy)]
pub struct FileHandle<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub case_policy: CasePolicy,
}

/// Aggregated result of validating one file. `records` counts the
/// rows that parsed completely; it is zero when the filename gate
/// rejected the file.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub file_name: String,
    pub records: usize,
    pub issues: IssueContainer,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Runs filename, structural and semantic validation in order and
/// aggregates every issue into one outcome. An invalid filename gates
/// the run: the file content is never parsed. Panics inside a stage
/// are caught, logged with a correlation id and converted into an
/// `InternalError` issue, so the pipeline itself never panics.
pub struct ValidationPipeline {
    options: PipelineOptions,
    logger: ErrorLogger,
}

impl ValidationPipeline {
    pub fn new(options: PipelineOptions, logger: ErrorLogger) -> Self {
        Self { options, logger }
    }

    pub fn logger(&self) -> &ErrorLogger {
        &self.logger
    }

    /// Validates one file start to finish. Data problems come back as
    /// issues in the outcome; `Err` is reserved for operational
    /// failures such as an unwritable error log.
    pub fn run(&self, file: &FileHandle<'_>) -> anyhow::Result<ValidationOutcome> {
        let mut issues = IssueContainer::new();
        let mut records = 0;

        match self.stage(file.name, &mut issues, || {
            validate_filename(file.name, self.options.case_policy)
        }) {
            Some(Some(issue)) => {
                // Gate: an unparseable or irrelevant file must not
                // produce spurious structural issues.
                issues.push(issue);
            }
            Some(None) => {
                let parsed = self.stage(file.name, &mut issues, || {
                    let mut stage_issues = IssueContainer::new();
                    let rows = validate_structure(file.data, &mut stage_issues);
                    (stage_issues, rows)
                });
                if let Some((stage_issues, rows)) = parsed {
                    issues.merge(stage_issues);
                    records = rows.iter().filter(|row| row.to_record().is_some()).count();
                    let semantic = self.stage(file.name, &mut issues, || {
                        let mut stage_issues = IssueContainer::new();
                        validate_semantic(&rows, &mut stage_issues);
                        stage_issues
                    });
                    if let Some(stage_issues) = semantic {
                        issues.merge(stage_issues);
                    }
                }
            }
            None => {}
        }

        let outcome = ValidationOutcome {
            file_name: file.name.to_string(),
            records,
            issues,
        };
        if !outcome.is_valid() {
            for issue in outcome.issues.iter() {
                self.logger
                    .record(&outcome.file_name, &format!("{}: {}", issue.code, issue.message))?;
            }
        }
        Ok(outcome)
    }

    fn stage<T>(
        &self,
        file: &str,
        issues: &mut IssueContainer,
        op: impl FnOnce() -> T,
    ) -> Option<T> {
        match catch_unwind(AssertUnwindSafe(op)) {
            Ok(value) => Some(value),
            Err(panic) => {
                let message = format!(
                    "validation stage failed: {}",
                    panic_payload_message(&*panic)
                );
                if let Err(err) = self.logger.record(file, &message) {
                    warn!("failed to write error log entry: {err:#}");
                }
                issues.push(ValidationIssue::internal_error(message));
                None
            }
        }
    }
}

fn panic_payload_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_log::{ErrorLog, ErrorLogEntry};
    use crate::identifier::IdentifierProvider;
    use crate::IssueCode;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const HEADER: &str =
        "PatientID,TrialCode,DrugCode,Dosage_mg,StartDate,EndDate,Outcome,SideEffects,Analyst";

    fn temp_log(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}.log", prefix, std::process::id(), nanos))
    }

    fn pipeline(path: &std::path::Path) -> ValidationPipeline {
        let log = ErrorLog::open(path).expect("open log");
        let logger = ErrorLogger::new(log, IdentifierProvider::local_only());
        ValidationPipeline::new(PipelineOptions::default(), logger)
    }

    fn log_entries(path: &std::path::Path) -> Vec<ErrorLogEntry> {
        fs::read_to_string(path)
            .expect("read log")
            .lines()
            .map(|line| serde_json::from_str(line).expect("parse entry"))
            .collect()
    }

    #[test]
    fn valid_file_round_trips_clean() {
        let path = temp_log("trialgate_pipeline_valid");
        let pipeline = pipeline(&path);
        let content =
            format!("{HEADER}\nP1,T1,D1,50,2024-01-01,2024-01-05,Improved,none,analyst1\n");
        let file = FileHandle {
            name: "CLINICALDATA_20250115120000.CSV",
            data: content.as_bytes(),
        };

        let outcome = pipeline.run(&file).expect("run");

        assert!(outcome.is_valid());
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.records, 1);
        assert!(log_entries(&path).is_empty());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_filename_gates_content_parsing() {
        let path = temp_log("trialgate_pipeline_gate");
        let pipeline = pipeline(&path);
        // Content is also malformed; none of it may be reported.
        let file = FileHandle {
            name: "notes.txt",
            data: b"garbage,with\nbroken,rows,everywhere",
        };

        let outcome = pipeline.run(&file).expect("run");

        assert!(!outcome.is_valid());
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(
            outcome.issues.iter().next().unwrap().code,
            IssueCode::InvalidFilename
        );
        assert_eq!(outcome.records, 0);
        assert_eq!(log_entries(&path).len(), 1);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn aggregates_issues_across_stages() {
        let path = temp_log("trialgate_pipeline_agg");
        let pipeline = pipeline(&path);
        let content = format!(
            "{HEADER}\n\
             P1,T1,D1,0,2024-01-01,2024-01-05,Improved,none,a1\n\
             P2,T1,D1,50,2024-02-01,2024-01-01,improved,none,a1\n"
        );
        let file = FileHandle {
            name: "CLINICALDATA_20250115120000.CSV",
            data: content.as_bytes(),
        };

        let outcome = pipeline.run(&file).expect("run");

        let codes: Vec<IssueCode> = outcome.issues.iter().map(|issue| issue.code).collect();
        assert!(codes.contains(&IssueCode::BadType));
        assert!(codes.contains(&IssueCode::DateOrderViolation));
        assert!(codes.contains(&IssueCode::InvalidOutcome));
        // One log entry per issue, each with a v4 correlation id.
        let entries = log_entries(&path);
        assert_eq!(entries.len(), outcome.issues.len());
        for entry in &entries {
            let parsed = uuid::Uuid::parse_str(&entry.correlation_id).expect("uuid");
            assert_eq!(parsed.get_version_num(), 4);
            assert_eq!(entry.file, "CLINICALDATA_20250115120000.CSV");
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn validation_is_idempotent() {
        let path = temp_log("trialgate_pipeline_idem");
        let pipeline = pipeline(&path);
        let content = format!(
            "{HEADER}\n\
             P1,T1,D1,0,2024-01-01,2024-01-05,Improved,none,a1\n\
             P1,T1,D1,50,2024-01-01,2024-01-05,Worsened,none,a1\n"
        );
        let file = FileHandle {
            name: "CLINICALDATA_20250115120000.CSV",
            data: content.as_bytes(),
        };

        let first = pipeline.run(&file).expect("first run");
        let second = pipeline.run(&file).expect("second run");

        let first_issues: Vec<_> = first.issues.iter().cloned().collect();
        let second_issues: Vec<_> = second.issues.iter().cloned().collect();
        assert_eq!(first_issues, second_issues);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn case_policy_reaches_the_gate() {
        let path = temp_log("trialgate_pipeline_case");
        let log = ErrorLog::open(&path).expect("open log");
        let logger = ErrorLogger::new(log, IdentifierProvider::local_only());
        let pipeline = ValidationPipeline::new(
            PipelineOptions {
                case_policy: CasePolicy::Insensitive,
            },
            logger,
        );
        let content =
            format!("{HEADER}\nP1,T1,D1,50,2024-01-01,2024-01-05,Improved,none,a1\n");
        let file = FileHandle {
            name: "clinicaldata_20250115120000.csv",
            data: content.as_bytes(),
        };

        let outcome = pipeline.run(&file).expect("run");
        assert!(outcome.is_valid());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn stage_panic_becomes_internal_error_issue() {
        let path = temp_log("trialgate_pipeline_panic");
        let pipeline = pipeline(&path);
        let mut issues = IssueContainer::new();

        let result: Option<()> = pipeline.stage("X.CSV", &mut issues, || {
            panic!("stage blew up");
        });

        assert!(result.is_none());
        assert_eq!(issues.len(), 1);
        let issue = issues.iter().next().unwrap();
        assert_eq!(issue.code, IssueCode::InternalError);
        assert!(issue.message.contains("stage blew up"));
        let entries = log_entries(&path);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("stage blew up"));

        fs::remove_file(&path).ok();
    }
}
