//! The `quizdraft show` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(set: u64, gateway: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let (config, gateway) = super::open_gateway(config_path.as_deref(), gateway.as_deref())?;
    let workflow = super::workflow(&config, gateway);
    let buffer = workflow.load(set).await?;

    if buffer.title().is_empty() {
        println!("Assessment {set}");
    } else {
        println!("Assessment {set}: {}", buffer.title());
    }

    if buffer.is_empty() {
        println!("No questions.");
        return Ok(());
    }

    println!("{}", super::question_table(buffer.questions()));
    println!("{}", super::total_line(buffer.total_points()));
    Ok(())
}
