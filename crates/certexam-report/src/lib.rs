//! certexam-report — exports for exam records.
//!
//! JSON persistence of exams and attempts, a self-contained HTML
//! attempt-history report for integrity review, and an HTML diploma
//! renderer.

pub mod diploma;
pub mod html;
pub mod json;

pub use diploma::HtmlDiplomaRenderer;
pub use html::{generate_html, write_html_report};
pub use json::{read_attempt_json, write_attempt_json, ExamReport};
