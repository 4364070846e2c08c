//! The `quizdraft regenerate` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(
    set: u64,
    count: Option<usize>,
    gateway: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, gateway) = super::open_gateway(config_path.as_deref(), gateway.as_deref())?;
    let count = count.unwrap_or(config.regenerate_count);
    anyhow::ensure!(count >= 1, "count must be at least 1");

    let mut workflow = super::workflow(&config, gateway);
    let mut buffer = workflow.load(set).await?;
    workflow.regenerate(&mut buffer, count).await?;

    println!("Regenerated assessment {set} with {} questions", buffer.len());
    println!("{}", super::question_table(buffer.questions()));
    println!("{}", super::total_line(buffer.total_points()));
    Ok(())
}
