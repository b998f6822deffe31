//! variantry-report: CSV and HTML exports.
//!
//! CSV column names are stable; downstream spreadsheets key on them.

pub mod csv;
pub mod html;

pub use csv::{
    answer_key_csv, distractors_csv, item_statistics_csv, student_scores_csv, write_csv,
};
pub use html::{generate_html, write_html_report};
