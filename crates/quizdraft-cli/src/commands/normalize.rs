//! The `quizdraft normalize` command.

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizdraft_core::normalize::normalize_points;

pub fn execute(points: &str) -> Result<()> {
    let input = parse_points(points)?;
    let output = normalize_points(&input);

    let mut table = Table::new();
    table.set_header(vec!["#", "Current", "Normalized"]);
    for (i, (before, after)) in input.iter().zip(&output).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(before),
            Cell::new(after),
        ]);
    }

    println!("{table}");
    println!(
        "Total: {} -> {}",
        input.iter().map(|&p| u64::from(p)).sum::<u64>(),
        output.iter().sum::<u32>()
    );
    Ok(())
}

fn parse_points(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("invalid point value: '{s}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_point_list() {
        assert_eq!(parse_points("37, 20,0").unwrap(), vec![37, 20, 0]);
        assert!(parse_points("").unwrap().is_empty());
        assert!(parse_points("10,-5").is_err());
    }
}
