//! `renest` — repair nested-class metadata in a remapped, merged jar.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use renest_core::{NestingReport, RepairOutcome, repair_in_place, repair_to, scan};
use renest_error::{RenestError, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "renest", version, about = "Repair nested-class metadata in merged jars")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repair an archive, replacing it in place (or writing to --output).
    Fix {
        /// The merged, remapped jar to repair.
        jar: PathBuf,
        /// Write the repaired archive here instead of replacing the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing --output file.
        #[arg(long)]
        force: bool,
        /// Print the applied-fix report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Report discrepancies without writing anything; exits 1 if any exist.
    Check {
        jar: PathBuf,
        /// Print the report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("RENEST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Fix {
            jar,
            output,
            force,
            json,
        } => {
            let outcome = match output {
                Some(path) if path.exists() && !force => {
                    info!(output = %path.display(), "output already exists, skipping (use --force to overwrite)");
                    return Ok(ExitCode::SUCCESS);
                }
                Some(path) => repair_to(&jar, &path)?,
                None => repair_in_place(&jar)?,
            };
            if json {
                emit_json(outcome.report())?;
            } else {
                emit_summary(&outcome);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { jar, json } => {
            let report = scan(&jar)?;
            if json {
                emit_json(&report)?;
            } else {
                for finding in &report.findings {
                    match &finding.subject {
                        Some(subject) => {
                            println!("{}: {} ({subject})", finding.class, finding.kind);
                        }
                        None => println!("{}: {}", finding.class, finding.kind),
                    }
                }
                println!(
                    "{} discrepancies across {} of {} classes with nesting",
                    report.findings.len(),
                    report.classes_affected,
                    report.classes_with_nesting,
                );
            }
            if report.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
    }
}

fn emit_summary(outcome: &RepairOutcome) {
    let report = outcome.report();
    match outcome {
        RepairOutcome::Clean(_) => println!("nothing to repair"),
        RepairOutcome::Repaired { output, .. } => println!(
            "applied {} fixes across {} classes -> {}",
            report.findings.len(),
            report.classes_affected,
            output.display(),
        ),
    }
}

fn emit_json(report: &NestingReport) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, report)
        .map_err(|e| RenestError::internal(format!("serializing report: {e}")))?;
    handle
        .write_all(b"\n")
        .map_err(|e| RenestError::internal(format!("writing report: {e}")))?;
    Ok(())
}
