//! The `quizdraft edit` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizdraft_core::error::GatewayError;
use quizdraft_core::model::QuestionId;
use quizdraft_core::parser::{parse_edit_script, EditNote};
use quizdraft_core::report::{ConfirmationReport, OperationKind, ReconciliationWarning};
use quizdraft_core::workflow::{
    AlwaysAccept, AlwaysDecline, ConfirmOutcome, NormalizationPrompt, WorkflowObserver,
    WorkflowState,
};

/// How to answer a normalization offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
    Ask,
}

/// Asks on stdin. End of input counts as "no".
struct StdinPrompt;

impl NormalizationPrompt for StdinPrompt {
    fn accept(&self, total: u64, proposal: &[u32]) -> bool {
        let proposal: Vec<String> = proposal.iter().map(u32::to_string).collect();
        eprint!(
            "Points add up to {total}, not 100. Normalize to [{}]? [y/N] ",
            proposal.join(", ")
        );
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Console progress observer.
struct ConsoleObserver;

impl WorkflowObserver for ConsoleObserver {
    fn on_state(&self, state: &WorkflowState) {
        tracing::debug!(%state, "workflow state");
    }

    fn on_point_total(&self, total: u64) {
        eprintln!("Point total: {total}");
    }

    fn on_operation(&self, kind: OperationKind, question: QuestionId, error: Option<&GatewayError>) {
        match error {
            None => eprintln!("  {kind} {question}: OK"),
            Some(e) => eprintln!("  {kind} {question}: FAILED ({e})"),
        }
    }

    fn on_warning(&self, warning: &ReconciliationWarning) {
        eprintln!(
            "  WARNING: question {} is gone from the store; kept locally as {} ({:?})",
            warning.question, warning.readopted_as, warning.statement
        );
    }
}

pub async fn execute(
    set: u64,
    script_path: PathBuf,
    decision: Decision,
    report_path: Option<PathBuf>,
    gateway: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let script = parse_edit_script(&script_path)?;
    let (config, gateway) = super::open_gateway(config_path.as_deref(), gateway.as_deref())?;
    let mut workflow = super::workflow(&config, gateway);
    let mut buffer = workflow.load(set).await?;

    for note in script.apply(&mut buffer) {
        match note {
            EditNote::Added(id) => eprintln!("Added {id}"),
            EditNote::Updated(id) => eprintln!("Updated {id}"),
            EditNote::Removed(id) => eprintln!("Removed {id}"),
            EditNote::UnknownId(id) => eprintln!("Skipped {id}: no such question"),
            EditNote::Rejected(reason) => eprintln!("Skipped add: {reason}"),
        }
    }

    if !buffer.is_dirty() {
        println!("Nothing to confirm.");
        return Ok(());
    }

    let prompt: &dyn NormalizationPrompt = match decision {
        Decision::Accept => &AlwaysAccept,
        Decision::Decline => &AlwaysDecline,
        Decision::Ask => &StdinPrompt,
    };

    let outcome = workflow.confirm(&mut buffer, prompt, &ConsoleObserver).await?;
    print_summary(outcome.report());

    if let Some(path) = &report_path {
        outcome.report().save_json(path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    match outcome {
        ConfirmOutcome::Synced(report) => {
            println!("Synced: {}", report.summary_line());
            if !report.warnings.is_empty() {
                println!(
                    "{} question(s) need attention; rerun with a script that re-adds or drops them.",
                    report.warnings.len()
                );
            }
            Ok(())
        }
        ConfirmOutcome::PartiallyApplied(report) => {
            anyhow::bail!(
                "{} of {} store calls failed; successful changes were kept",
                report.failed_count(),
                report.failed_count() + report.succeeded_count()
            )
        }
    }
}

fn print_summary(report: &ConfirmationReport) {
    let mut table = Table::new();
    table.set_header(vec!["Operation", "Succeeded", "Failed"]);
    for kind in [OperationKind::Create, OperationKind::Update, OperationKind::Delete] {
        let tally = report.tally(kind);
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(tally.succeeded),
            Cell::new(tally.failed),
        ]);
    }
    println!("{table}");

    for failure in &report.failures {
        println!("  {} {}: {}", failure.kind, failure.question, failure.message);
    }
}
