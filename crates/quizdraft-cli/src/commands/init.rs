//! The `quizdraft init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("quizdraft.toml", SAMPLE_CONFIG)?;
    write_if_missing("quizdraft-store.json", SAMPLE_STORE)?;
    write_if_missing("edits.toml", SAMPLE_EDITS)?;

    println!("\nNext steps:");
    println!("  1. Run: quizdraft show --set 1");
    println!("  2. Run: quizdraft edit --set 1 --script edits.toml");
    println!("  3. Point a [gateways.*] entry at your assessment API when ready");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizdraft configuration

default_gateway = "local"
call_delay_ms = 0
regenerate_count = 5

[gateways.local]
type = "file"
path = "quizdraft-store.json"

[gateways.api]
type = "http"
base_url = "http://localhost:8080/api"
api_token = "${QUIZDRAFT_API_TOKEN}"
timeout_secs = 30
"#;

const SAMPLE_STORE: &str = r#"{
  "next_id": 4,
  "sets": {
    "1": {
      "assessment_id": 1,
      "title": "Rust fundamentals",
      "questions": [
        {
          "id": 1,
          "kind": "MULTIPLE_CHOICE",
          "statement": "Which keyword declares an immutable binding?",
          "options": ["let", "mut", "static"],
          "correct_answer": "let",
          "points": 40,
          "order": 1
        },
        {
          "id": 2,
          "kind": "TRUE_FALSE",
          "statement": "Rust has a garbage collector.",
          "options": ["True", "False"],
          "correct_answer": "False",
          "points": 30,
          "order": 2
        },
        {
          "id": 3,
          "kind": "OPEN",
          "statement": "Explain what the borrow checker prevents.",
          "points": 30,
          "order": 3
        }
      ]
    }
  }
}
"#;

const SAMPLE_EDITS: &str = r#"# Edits are applied in order, then confirmed against the store.

[[edits]]
op = "update"
id = 3
statement = "Explain what the borrow checker prevents, with an example."

[[edits]]
op = "add"
kind = "code"
statement = "Write a function that reverses a Vec<i32> in place."
points = 20
order = 4

[[edits]]
op = "remove"
id = 2
"#;
