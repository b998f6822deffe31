//! The `variantry` command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod store;

#[derive(Parser)]
#[command(
    name = "variantry",
    version,
    about = "Exam variant generator and item-analysis engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example exam
    Init,

    /// Validate exam TOML files
    Validate {
        /// Path to exam file or directory
        #[arg(long)]
        exam: PathBuf,
    },

    /// Generate randomized variants and their answer keys
    Generate {
        /// Exam TOML file
        #[arg(long)]
        exam: PathBuf,

        /// Generation seed (the generation id)
        #[arg(long)]
        seed: String,

        /// Number of variants (1-10)
        #[arg(long)]
        variants: Option<u8>,

        /// Keep the original question order
        #[arg(long)]
        no_question_shuffle: bool,

        /// Keep the original option order
        #[arg(long)]
        no_option_shuffle: bool,

        /// Also shuffle True/False options
        #[arg(long)]
        shuffle_true_false: bool,

        /// Scored responses already recorded against existing variants
        #[arg(long)]
        responses: Option<PathBuf>,

        /// Replace existing variants that have no recorded responses
        #[arg(long)]
        force: bool,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score letter-coded submissions against their variants
    Score {
        /// Exam TOML file
        #[arg(long)]
        exam: PathBuf,

        /// variants.json written by `generate`
        #[arg(long)]
        variants: PathBuf,

        /// JSON array of raw submissions
        #[arg(long)]
        submissions: PathBuf,

        /// Where to write scored responses [default: responses.json next to the variants]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run item analysis over scored responses
    Analyze {
        /// Exam TOML file
        #[arg(long)]
        exam: PathBuf,

        /// variants.json written by `generate`
        #[arg(long)]
        variants: PathBuf,

        /// Scored responses written by `score`
        #[arg(long)]
        responses: PathBuf,

        /// Also run the integrity screen
        #[arg(long)]
        integrity: bool,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, csv, markdown, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Screen responses for answer copying and key leaks
    Integrity {
        /// variants.json written by `generate`
        #[arg(long)]
        variants: PathBuf,

        /// Scored responses written by `score`
        #[arg(long)]
        responses: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rank students and filter by percentile
    Rank {
        /// Scored responses written by `score`
        #[arg(long)]
        responses: PathBuf,

        /// Lower percentile bound (inclusive)
        #[arg(long, default_value = "0")]
        from: f64,

        /// Upper percentile bound (exclusive, except at 100)
        #[arg(long, default_value = "100")]
        to: f64,

        /// Also write the ranking as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Compare item difficulty between two analysis reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Difficulty change that counts as drift
        #[arg(long, default_value = "0.1")]
        threshold: f64,

        /// Exit code 1 if any item drifted
        #[arg(long)]
        fail_on_drift: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("variantry=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Generate {
            exam,
            seed,
            variants,
            no_question_shuffle,
            no_option_shuffle,
            shuffle_true_false,
            responses,
            force,
            output,
            config,
        } => commands::generate::execute(commands::generate::GenerateArgs {
            exam,
            seed,
            variants,
            no_question_shuffle,
            no_option_shuffle,
            shuffle_true_false,
            responses,
            force,
            output,
            config,
        }),
        Commands::Score {
            exam,
            variants,
            submissions,
            output,
        } => commands::score::execute(exam, variants, submissions, output),
        Commands::Analyze {
            exam,
            variants,
            responses,
            integrity,
            output,
            format,
            config,
        } => commands::analyze::execute(
            exam, variants, responses, integrity, output, format, config,
        ),
        Commands::Integrity {
            variants,
            responses,
            format,
            config,
        } => commands::integrity::execute(variants, responses, format, config),
        Commands::Rank {
            responses,
            from,
            to,
            csv,
        } => commands::rank::execute(responses, from, to, csv),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_drift,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_drift, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
