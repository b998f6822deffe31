//! Tool configuration (`variantry.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisOptions;
use crate::integrity::IntegrityOptions;
use crate::model::GenerationConfig;

/// Defaults applied to `generate` when the command line does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    pub number_of_variants: u8,
    pub randomize_question_order: bool,
    pub randomize_option_order: bool,
    pub randomize_true_false_options: bool,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            number_of_variants: 3,
            randomize_question_order: true,
            randomize_option_order: true,
            randomize_true_false_options: false,
        }
    }
}

impl GenerationDefaults {
    /// A generation config for `seed` using these defaults.
    pub fn to_config(&self, seed: impl Into<String>) -> GenerationConfig {
        GenerationConfig {
            number_of_variants: self.number_of_variants,
            randomize_question_order: self.randomize_question_order,
            randomize_option_order: self.randomize_option_order,
            randomize_true_false_options: self.randomize_true_false_options,
            seed: seed.into(),
        }
    }
}

/// Top-level variantry configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantryConfig {
    #[serde(default)]
    pub generation: GenerationDefaults,
    #[serde(default)]
    pub analysis: AnalysisOptions,
    #[serde(default)]
    pub integrity: IntegrityOptions,
    /// Output directory for generated files and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./variantry-out")
}

/// Name of the config file searched in the working directory.
pub const CONFIG_FILE_NAME: &str = "variantry.toml";

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `variantry.toml` in the current directory
/// 2. `~/.config/variantry/config.toml`
///
/// `VARIANTRY_OUTPUT_DIR` overrides the output directory.
pub fn load_config() -> Result<VariantryConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VariantryConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config_file(&path)?
        }
        None => VariantryConfig::default(),
    };

    if let Ok(dir) = std::env::var("VARIANTRY_OUTPUT_DIR") {
        if !dir.trim().is_empty() {
            config.output_dir = PathBuf::from(dir);
        }
    }

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<VariantryConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<VariantryConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("variantry"))
}

/// Sample config written by `variantry init`.
pub const SAMPLE_CONFIG: &str = r#"# variantry configuration

output_dir = "./variantry-out"

[generation]
number_of_variants = 3
randomize_question_order = true
randomize_option_order = true
randomize_true_false_options = false

[analysis]
min_sample_size = 10
confidence_level = 0.95
group_fraction = 0.27
include_distractors = true
include_point_biserial = true
include_reliability = true

[integrity]
z_threshold = 3.0
min_identical_incorrect = 3
key_match_threshold = 0.8
min_shared_items = 5
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = VariantryConfig::default();
        assert_eq!(config.generation.number_of_variants, 3);
        assert_eq!(config.analysis.min_sample_size, 10);
        assert_eq!(config.integrity.z_threshold, 3.0);
    }

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: VariantryConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.generation, GenerationDefaults::default());
        assert_eq!(config.analysis, AnalysisOptions::default());
        assert_eq!(config.integrity, IntegrityOptions::default());
        assert_eq!(config.output_dir, PathBuf::from("./variantry-out"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: VariantryConfig = toml::from_str(
            r#"
[generation]
number_of_variants = 5

[analysis]
min_sample_size = 30
"#,
        )
        .unwrap();
        assert_eq!(config.generation.number_of_variants, 5);
        assert!(config.generation.randomize_option_order);
        assert_eq!(config.analysis.min_sample_size, 30);
        assert_eq!(config.analysis.confidence_level, 0.95);
        assert_eq!(config.integrity.min_identical_incorrect, 3);
    }

    #[test]
    fn generation_defaults_build_a_config() {
        let config = GenerationDefaults::default().to_config("gen-7");
        assert_eq!(config.seed, "gen-7");
        assert_eq!(config.number_of_variants, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[integrity]\nz_threshold = 2.5\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.integrity.z_threshold, 2.5);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
