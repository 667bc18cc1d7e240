//! Validation engine for clinical-trial CSV submissions: filename
//! convention, structural and semantic CSV rules, and an append-only
//! error log whose entries carry a correlation identifier fetched
//! from a remote service with local fallback.

pub mod error_log;
pub mod filename;
pub mod identifier;
mod issue;
pub mod pipeline;
pub mod semantic;
pub mod structure;

pub use error_log::{ErrorLog, ErrorLogEntry, ErrorLogger};
pub use filename::{validate_filename, CasePolicy};
pub use identifier::{
    IdentifierProvider, IdentifierSource, LocalIdentifierSource, RemoteIdentifierSource,
    DEFAULT_IDENTIFIER_ENDPOINT, DEFAULT_IDENTIFIER_TIMEOUT,
};
pub use issue::{IssueCode, IssueContainer, ValidationIssue};
pub use pipeline::{FileHandle, PipelineOptions, ValidationOutcome, ValidationPipeline};
pub use semantic::validate_semantic;
pub use structure::{validate_structure, RowData, REQUIRED_HEADER};
