//! Array-encoded Katz backoff scoring.
//!
//! Scores a literal word-id sequence without encoded contexts: every
//! suffix is looked up from scratch. Slower than [`crate::BackoffLm`] for
//! running text, but needs nothing from the caller beyond the words.

use crate::config::LmConfig;
use crate::error::{LmError, Result};
use crate::lm::NgramLanguageModel;
use crate::store::{NgramIndex, NgramStore, ProbBackoffValues};
use crate::vocab::{Vocabulary, WordId};

/// Katz backoff language model scoring n-grams given as word arrays.
pub struct ArrayBackoffLm<S = NgramStore> {
    lm_order: usize,
    vocabulary: Vocabulary,
    store: S,
    config: LmConfig,
}

impl<S> ArrayBackoffLm<S>
where
    S: NgramIndex + ProbBackoffValues,
{
    pub fn new(lm_order: usize, vocabulary: Vocabulary, store: S, config: LmConfig) -> Result<Self> {
        if lm_order < 1 {
            return Err(LmError::InvalidOrder(lm_order));
        }
        if store.num_orders() < lm_order {
            return Err(LmError::Config(format!(
                "store holds {} orders, model order is {}",
                store.num_orders(),
                lm_order
            )));
        }
        config.validate()?;
        Ok(Self {
            lm_order,
            vocabulary,
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> NgramLanguageModel for ArrayBackoffLm<S>
where
    S: NgramIndex + ProbBackoffValues,
{
    fn lm_order(&self) -> usize {
        self.lm_order
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn config(&self) -> &LmConfig {
        &self.config
    }

    fn ngram_log_prob(&self, ngram: &[WordId]) -> f32 {
        assert!(!ngram.is_empty(), "cannot score an empty n-gram");
        let ngram = &ngram[ngram.len().saturating_sub(self.lm_order)..];
        let context_len = ngram.len() - 1;
        let store = &self.store;

        // Longest suffix first; each miss charges the backoff of the
        // context that was just dropped.
        let mut backoff_sum = 0.0f32;
        for start in 0..=context_len {
            let suffix = &ngram[start..];
            let prob = store
                .lookup(suffix)
                .and_then(|offset| store.prob(suffix.len() - 1, offset));
            if let Some(prob) = prob {
                return backoff_sum + prob;
            }

            let context = &ngram[start..context_len];
            if let Some(offset) = store.lookup(context) {
                backoff_sum += store.backoff(context.len() - 1, offset).unwrap_or(0.0);
            }
        }
        self.config.oov_word_log_prob
    }
}

impl<S> std::fmt::Debug for ArrayBackoffLm<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayBackoffLm")
            .field("lm_order", &self.lm_order)
            .field("vocabulary", &self.vocabulary)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
