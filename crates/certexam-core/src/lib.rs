//! certexam-core — Final exam sessions, scoring, and certificate eligibility.
//!
//! This crate defines the data model, the exam session state machine, and
//! the pure policies (scoring, retake cooldown, eligibility, diploma
//! issuance) that the rest of certexam builds on. Collaborators such as the
//! question generator and the diploma renderer plug in through [`traits`].

pub mod clock;
pub mod cooldown;
pub mod diploma;
pub mod driver;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod levels;
pub mod model;
pub mod plan;
pub mod pool;
pub mod scoring;
pub mod selection;
pub mod session;
pub mod settings;
pub mod shuffle;
pub mod statistics;
pub mod timer;
pub mod traits;
