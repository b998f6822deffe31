//! variantry-core: exam variant generation and item analysis.
//!
//! This crate defines the data model, the seeded variant generator, answer
//! normalization across variants, and the statistics the rest of variantry
//! builds on.

pub mod analysis;
pub mod config;
pub mod error;
pub mod generator;
pub mod integrity;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod percentile;
pub mod prng;
pub mod record;
pub mod report;
pub mod resolver;
pub mod statistics;
