//! Query execution for Quill.
//!
//! This module isolates connection lifecycle, validation-gated submission
//! and the question-answering pipeline from the command line.

mod ask;
mod executor;

pub use ask::{ask, AskOutcome, MAX_QUESTION_CHARS, MIN_QUESTION_CHARS};
pub use executor::{QueryExecutor, REJECTED_MESSAGE};
