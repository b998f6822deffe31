//! JSON files exchanged between commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use variantry_core::generator::GenerationOutcome;
use variantry_core::model::Variant;
use variantry_core::record::VariantRecord;

pub const VARIANTS_FILE: &str = "variants.json";
pub const RESPONSES_FILE: &str = "responses.json";

/// `variants.json`: one generation in storage form.
#[derive(Debug, Serialize, Deserialize)]
pub struct VariantFile {
    pub exam_id: String,
    pub generation: String,
    pub created_at: DateTime<Utc>,
    pub variants: Vec<VariantRecord>,
}

/// Where `score` records responses for a generation by default.
pub fn responses_path_for(variants_path: &Path) -> PathBuf {
    variants_path
        .parent()
        .map_or_else(|| PathBuf::from(RESPONSES_FILE), |dir| dir.join(RESPONSES_FILE))
}

pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {what} JSON: {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_variants(path: &Path, exam_id: &str, outcome: &GenerationOutcome) -> Result<()> {
    let variants = outcome
        .variants
        .iter()
        .map(Variant::to_record)
        .collect::<Result<Vec<_>, _>>()?;
    let file = VariantFile {
        exam_id: exam_id.to_string(),
        generation: outcome.generation.clone(),
        created_at: Utc::now(),
        variants,
    };
    write_json(path, &file)
}

/// Load a generation, decoding each stored record.
pub fn load_variants(path: &Path) -> Result<(VariantFile, Vec<Variant>)> {
    let file: VariantFile = read_json(path, "variants")?;
    let mut variants = Vec::with_capacity(file.variants.len());
    for record in &file.variants {
        let (variant, warnings) = Variant::from_record(record);
        if !warnings.is_empty() {
            eprintln!(
                "Warning: {} has {} malformed field(s), using fallbacks",
                variant.variant_code,
                warnings.len()
            );
        }
        variants.push(variant);
    }
    tracing::debug!(
        "loaded {} variants of generation '{}'",
        variants.len(),
        file.generation
    );
    Ok((file, variants))
}
