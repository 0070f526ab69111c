//! Error types for model construction

/// Errors raised while assembling a language model.
///
/// Scoring itself never fails: a missing n-gram is the normal trigger for
/// backing off, not an error.
#[derive(Debug, thiserror::Error)]
pub enum LmError {
    #[error("invalid model order: {0} (must be >= 1)")]
    InvalidOrder(usize),

    #[error("n-gram must contain at least one word")]
    EmptyNgram,

    #[error("n-gram of length {len} exceeds model order {lm_order}")]
    NgramTooLong { len: usize, lm_order: usize },

    #[error("non-finite {what} for n-gram '{ngram}': {value}")]
    NonFiniteValue {
        what: &'static str,
        ngram: String,
        value: f32,
    },

    #[error("n-gram '{ngram}' was added without its prefix '{prefix}'")]
    MissingPrefix { ngram: String, prefix: String },

    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LmError>;
