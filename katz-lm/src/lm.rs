//! Shared scoring capability for n-gram language models.
//!
//! Two encodings implement it:
//! - array-encoded models score a literal sequence of word ids
//! - context-encoded models score one word at a time against an opaque
//!   [`LmContext`], and hand back the context to use for the next word
//!
//! Whole-sentence scoring is shared through the free functions in
//! [`crate::scoring`].

use crate::config::LmConfig;
use crate::scoring;
use crate::vocab::{Vocabulary, WordId};

/// An encoded context: an offset into the n-gram index paired with the
/// 0-based order of the n-gram it names.
///
/// `order == -1` is the empty context. The offset is an opaque handle and is
/// only meaningful together with its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LmContext {
    pub offset: u64,
    pub order: i32,
}

impl LmContext {
    /// The context with no preceding words.
    pub const EMPTY: LmContext = LmContext {
        offset: 0,
        order: -1,
    };

    pub fn new(offset: u64, order: i32) -> Self {
        Self { offset, order }
    }

    pub fn is_empty(&self) -> bool {
        self.order < 0
    }

    /// Number of words this context represents.
    pub fn len(&self) -> usize {
        (self.order + 1).max(0) as usize
    }
}

impl Default for LmContext {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Common interface of every n-gram language model.
///
/// All scores are log10 probabilities.
pub trait NgramLanguageModel: Send + Sync {
    /// Maximum n-gram length the model stores.
    fn lm_order(&self) -> usize;

    fn vocabulary(&self) -> &Vocabulary;

    fn config(&self) -> &LmConfig;

    /// Constant returned when a word is missing even as a unigram.
    fn oov_word_log_prob(&self) -> f32 {
        self.config().oov_word_log_prob
    }

    /// Log probability of the last word of `ngram` given the words before it.
    ///
    /// Only the last `lm_order` words are considered.
    ///
    /// # Panics
    /// Panics if `ngram` is empty.
    fn ngram_log_prob(&self, ngram: &[WordId]) -> f32;

    /// Score a sentence, adding the `<s>` and `</s>` boundary tags.
    fn score_sentence(&self, sentence: &[&str]) -> f32 {
        scoring::score_sentence_by_windows(self, sentence)
    }

    /// Log probability of the last word of `phrase` given the words before it.
    /// No boundary tags are added.
    fn phrase_log_prob(&self, phrase: &[&str]) -> f32 {
        scoring::phrase_log_prob(self, phrase)
    }
}

/// A model that scores words against encoded contexts.
pub trait ContextEncodedLm: NgramLanguageModel {
    /// Log probability of `word` following `context`.
    ///
    /// # Panics
    /// Panics if `context.order` is outside `-1..=lm_order - 2`.
    fn log_prob(&self, context: LmContext, word: WordId) -> f32;

    /// Like [`ContextEncodedLm::log_prob`], also returning the context to use
    /// for the word after `word`.
    ///
    /// The returned context is `None` when `word` scored the OOV constant;
    /// the caller should then continue from [`LmContext::EMPTY`].
    fn log_prob_with_context(&self, context: LmContext, word: WordId) -> (f32, Option<LmContext>);

    /// Encode the longest stored suffix of `ngram` usable as a context.
    fn context_for_ngram(&self, ngram: &[WordId]) -> LmContext;

    /// Decode the words of `context`, followed by `word`.
    ///
    /// # Panics
    /// Panics if `context` was not produced by this model.
    fn ngram_for_context(&self, context: LmContext, word: WordId) -> Vec<WordId>;
}
