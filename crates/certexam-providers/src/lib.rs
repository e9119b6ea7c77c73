//! certexam-providers — question-pool generators.
//!
//! Implements `QuestionPoolGenerator` on top of any `CompletionClient`, so
//! the exam engine can build pools from a text completion backend without
//! this crate owning a network transport.

pub mod batched;
pub mod mock;
pub mod prompt;
pub mod response;

pub use batched::{batch_sizes, BatchedGenerator, MAX_BATCH_SIZE};
pub use mock::{MockCompletionClient, MockGenerator};
pub use response::{extract_json_object, parse_questions};
