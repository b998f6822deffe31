//! The `variantry init` command.

use std::path::Path;

use anyhow::Result;

use variantry_core::config::{CONFIG_FILE_NAME, SAMPLE_CONFIG};

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all("exams")?;
    let example_path = Path::new("exams/example.toml");
    if example_path.exists() {
        println!("exams/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: variantry validate --exam exams/example.toml");
    println!("  2. Run: variantry generate --exam exams/example.toml --seed midterm-2026");
    println!("  3. Collect answer sheets, then: variantry score ...");

    Ok(())
}

const EXAMPLE_EXAM: &str = r#"[exam]
id = "example"
name = "Example Exam"
description = "A short exam to get started"
default_points = 1.0

[[questions]]
id = "capital"
text = "What is the capital of France?"
type = "multiple_choice"
options = ["Berlin", "Paris", "Rome", "Madrid"]
correct_answer = "Paris"

[[questions]]
id = "planets"
text = "How many planets orbit the Sun?"
options = ["7", "8", "9", "10"]
correct_answer = "8"
points = 2.0
negative_points = 0.5

[[questions]]
id = "water"
text = "Water boils at 100 degrees Celsius at sea level."
type = "true_false"
correct_answer = "True"
"#;
