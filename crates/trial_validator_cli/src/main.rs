use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use trialgate_core::{
    CasePolicy, ErrorLog, ErrorLogger, FileHandle, IdentifierProvider, PipelineOptions,
    ValidationPipeline, DEFAULT_IDENTIFIER_ENDPOINT,
};
use trialgate_report::ValidationReport;

#[derive(Debug, Parser)]
#[command(name = "trialgate")]
#[command(about = "Clinical-trial CSV submission validator")]
struct Args {
    /// CSV files to validate.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Append-only error log path.
    #[arg(
        short = 'l',
        long = "error_log",
        alias = "error-log",
        default_value = "error_report.log"
    )]
    error_log: PathBuf,

    /// Directory for per-file JSON reports.
    #[arg(short = 'o', long = "output_dir", alias = "output-dir")]
    output: Option<PathBuf>,

    /// Accept any casing of the CLINICALDATA_ prefix and .CSV extension.
    #[arg(long = "case_insensitive", alias = "case-insensitive")]
    case_insensitive: bool,

    /// Correlation identifier service endpoint.
    #[arg(
        long = "id_endpoint",
        alias = "id-endpoint",
        default_value = DEFAULT_IDENTIFIER_ENDPOINT
    )]
    id_endpoint: String,

    /// Identifier service timeout in seconds.
    #[arg(long = "id_timeout", alias = "id-timeout", default_value_t = 5)]
    id_timeout: u64,

    /// Generate correlation identifiers locally, skipping the remote
    /// service entirely.
    #[arg(long = "local_ids", alias = "local-ids")]
    local_ids: bool,

    /// Pretty-print JSON reports.
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let ids = if args.local_ids {
        IdentifierProvider::local_only()
    } else {
        IdentifierProvider::with_endpoint(
            args.id_endpoint.clone(),
            Duration::from_secs(args.id_timeout),
        )
    };
    let log = ErrorLog::open(&args.error_log)?;
    let logger = ErrorLogger::new(log, ids);
    let pipeline = ValidationPipeline::new(
        PipelineOptions {
            case_policy: if args.case_insensitive {
                CasePolicy::Insensitive
            } else {
                CasePolicy::Strict
            },
        },
        logger,
    );

    if let Some(output) = args.output.as_deref() {
        std::fs::create_dir_all(output)
            .with_context(|| format!("create output dir {}", output.display()))?;
    }

    let mut rejected = 0usize;
    let mut failed = 0usize;
    for path in &args.files {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let data = match pipeline
            .logger()
            .run(&name, || {
                std::fs::read(path).with_context(|| format!("read {}", path.display()))
            }) {
            Ok(data) => data,
            Err(err) => {
                error!("{name}: {err:#}");
                failed += 1;
                continue;
            }
        };

        let outcome = match pipeline.run(&FileHandle {
            name: &name,
            data: &data,
        }) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("{name}: {err:#}");
                failed += 1;
                continue;
            }
        };

        let report = ValidationReport::from_outcome(outcome);
        if !report.is_valid {
            rejected += 1;
        }
        print!("{}", report.render_text());

        if let Some(output) = args.output.as_deref() {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("report");
            let report_path = output.join(format!("{stem}.report.json"));
            report.write_json(&report_path, args.pretty)?;
            info!("report written to {}", report_path.display());
        }
    }

    if failed > 0 {
        error!("{failed} file(s) could not be processed");
        return Ok(ExitCode::from(2));
    }
    if rejected > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
