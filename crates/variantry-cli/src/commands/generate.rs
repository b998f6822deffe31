//! The `variantry generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use variantry_core::generator::{generate_variants, regenerate_variants};
use variantry_core::model::StudentResponse;
use variantry_core::parser::{parse_exam, validate_exam};

use crate::store;

pub struct GenerateArgs {
    pub exam: PathBuf,
    pub seed: String,
    pub variants: Option<u8>,
    pub no_question_shuffle: bool,
    pub no_option_shuffle: bool,
    pub shuffle_true_false: bool,
    pub responses: Option<PathBuf>,
    pub force: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let config = variantry_core::config::load_config_from(args.config.as_deref())?;
    let exam = parse_exam(&args.exam)?;

    let warnings = validate_exam(&exam);
    for w in &warnings {
        eprintln!(
            "Warning [{}]: {}",
            w.question_id.as_deref().unwrap_or("exam"),
            w.message
        );
    }

    let mut generation = config.generation.to_config(args.seed);
    if let Some(n) = args.variants {
        generation.number_of_variants = n;
    }
    if args.no_question_shuffle {
        generation.randomize_question_order = false;
    }
    if args.no_option_shuffle {
        generation.randomize_option_order = false;
    }
    if args.shuffle_true_false {
        generation.randomize_true_false_options = true;
    }

    let output_dir = args.output.unwrap_or(config.output_dir);
    let variants_path = output_dir.join(store::VARIANTS_FILE);

    let outcome = if variants_path.exists() {
        let (_, existing) = store::load_variants(&variants_path)?;
        let recorded = store::responses_path_for(&variants_path);
        let mut responses: Vec<StudentResponse> = Vec::new();
        if let Some(path) = &args.responses {
            responses.extend(store::read_json::<Vec<StudentResponse>>(path, "responses")?);
        }
        if recorded.exists() && args.responses.as_ref() != Some(&recorded) {
            responses.extend(store::read_json::<Vec<StudentResponse>>(&recorded, "responses")?);
        } else if args.responses.is_none() && !args.force {
            anyhow::bail!(
                "{} already exists; pass --responses with the recorded results, or --force if none were recorded",
                variants_path.display()
            );
        }
        regenerate_variants(&exam.questions, &generation, &existing, &responses)
            .context("cannot regenerate variants")?
    } else {
        generate_variants(&exam.questions, &generation)?
    };

    for w in &outcome.warnings {
        eprintln!("Warning: {w}");
    }

    store::save_variants(&variants_path, &exam.id, &outcome)?;
    let key_path = output_dir.join("answer-keys.csv");
    variantry_report::write_csv(
        &variantry_report::answer_key_csv(&outcome.variants),
        &key_path,
    )?;

    let mut table = Table::new();
    table.set_header(vec!["Variant", "Question order", "Answer key"]);
    for v in &outcome.variants {
        let order: Vec<String> = v
            .question_order
            .iter()
            .filter_map(|&i| exam.questions.get(i).map(|q| q.id.clone()))
            .collect();
        let key: Vec<&str> = v
            .answer_key
            .iter()
            .map(|e| e.correct_answer.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(&v.variant_code),
            Cell::new(order.join(" ")),
            Cell::new(key.join(" ")),
        ]);
    }
    eprintln!("\n{table}");

    println!(
        "Generated {} variant(s) of '{}' (generation '{}')",
        outcome.total_generated, exam.name, outcome.generation
    );
    println!("Variants: {}", variants_path.display());
    println!("Answer keys: {}", key_path.display());

    Ok(())
}
