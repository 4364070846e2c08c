pub mod edit;
pub mod init;
pub mod normalize;
pub mod regenerate;
pub mod show;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizdraft_core::model::{Question, POINT_BUDGET};
use quizdraft_core::traits::PersistenceGateway;
use quizdraft_core::workflow::{ConfirmationWorkflow, WorkflowConfig};
use quizdraft_gateway::config::{create_gateway, load_config_from, QuizdraftConfig};

/// Load the config and build the selected gateway.
pub(crate) fn open_gateway(
    config_path: Option<&Path>,
    gateway: Option<&str>,
) -> Result<(QuizdraftConfig, Arc<dyn PersistenceGateway>)> {
    let config = load_config_from(config_path)?;
    let (name, gateway_config) = config.gateway(gateway)?;
    let gateway = create_gateway(name, gateway_config)?;
    tracing::debug!(gateway = gateway.name(), "gateway ready");
    Ok((config, gateway))
}

pub(crate) fn workflow(
    config: &QuizdraftConfig,
    gateway: Arc<dyn PersistenceGateway>,
) -> ConfirmationWorkflow {
    ConfirmationWorkflow::new(
        gateway,
        WorkflowConfig {
            call_delay: Duration::from_millis(config.call_delay_ms),
        },
    )
}

pub(crate) fn question_table(questions: &[Question]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Kind", "Statement", "Options", "Answer", "Points"]);
    for q in questions {
        table.add_row(vec![
            Cell::new(q.id),
            Cell::new(q.kind),
            Cell::new(&q.statement),
            Cell::new(q.options.join(", ")),
            Cell::new(&q.correct_answer),
            Cell::new(q.points),
        ]);
    }
    table
}

pub(crate) fn total_line(total: u64) -> String {
    if total == u64::from(POINT_BUDGET) {
        format!("Total: {total} points")
    } else {
        format!("Total: {total} points (expected {POINT_BUDGET})")
    }
}
