//! Katz backoff n-gram language model scoring.
//!
//! The core is [`BackoffLm`], which scores a word against an encoded context
//! and returns the context to reuse for the following word, so a sentence is
//! scored in a single left-to-right pass.

pub mod array;
pub mod backoff;
pub mod builder;
pub mod config;
pub mod error;
pub mod lm;
pub mod scoring;
pub mod store;
pub mod vocab;

pub use array::ArrayBackoffLm;
pub use backoff::{BackoffLm, continuation_context};
pub use builder::LmBuilder;
pub use config::{LmConfig, UnknownWordPolicy};
pub use error::LmError;
pub use lm::{ContextEncodedLm, LmContext, NgramLanguageModel};
pub use store::{NgramEntry, NgramIndex, NgramStore, ProbBackoffValues};
pub use vocab::{Vocabulary, WordId};
