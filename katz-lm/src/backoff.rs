//! Context-encoded Katz backoff scoring.

use crate::config::LmConfig;
use crate::error::{LmError, Result};
use crate::lm::{ContextEncodedLm, LmContext, NgramLanguageModel};
use crate::scoring;
use crate::store::{NgramIndex, NgramStore, ProbBackoffValues};
use crate::vocab::{Vocabulary, WordId};

/// Katz backoff language model over encoded contexts.
///
/// Scoring a word walks from the given context down to shorter suffix
/// contexts, adding each context's backoff weight, until the n-gram is
/// found. The model is immutable and can be shared across threads.
pub struct BackoffLm<S = NgramStore> {
    lm_order: usize,
    vocabulary: Vocabulary,
    store: S,
    config: LmConfig,
}

impl<S> BackoffLm<S>
where
    S: NgramIndex + ProbBackoffValues,
{
    /// Wrap a store holding n-grams up to length `lm_order`.
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

    /// Highest context order a caller may pass in.
    pub fn max_context_order(&self) -> i32 {
        self.lm_order as i32 - 2
    }

    fn score(&self, context: LmContext, word: WordId, want_context: bool) -> (f32, Option<LmContext>) {
        assert!(
            (-1..=self.max_context_order()).contains(&context.order),
            "context order {} outside -1..={}",
            context.order,
            self.max_context_order()
        );

        let store = &self.store;
        let mut order = context.order;
        let mut offset = context.offset;
        let mut backoff_sum = 0.0f32;
        loop {
            let ngram_order = (order + 1) as usize;
            let hit = store
                .resolve(offset, order, word)
                .and_then(|entry| store.prob(ngram_order, entry).map(|prob| (entry, prob)));

            if let Some((entry, prob)) = hit {
                let next = want_context
                    .then(|| continuation_context(store, entry, ngram_order, self.lm_order));
                return (backoff_sum + prob, next);
            }

            if order < 0 {
                return (self.config.oov_word_log_prob, None);
            }

            backoff_sum += store.backoff(order as usize, offset).unwrap_or(0.0);
            offset = if order == 0 {
                0
            } else {
                store.suffix_offset(offset, order as usize)
            };
            order -= 1;
        }
    }
}

/// Context to carry forward after a hit at `(hit_offset, hit_order)`.
///
/// A full-length n-gram cannot be extended, so its suffix is returned
/// instead; any shorter n-gram is returned as is.
pub fn continuation_context<V>(values: &V, hit_offset: u64, hit_order: usize, lm_order: usize) -> LmContext
where
    V: ProbBackoffValues + ?Sized,
{
    if hit_order + 1 == lm_order {
        LmContext::new(
            values.suffix_offset(hit_offset, hit_order),
            hit_order as i32 - 1,
        )
    } else {
        LmContext::new(hit_offset, hit_order as i32)
    }
}

impl<S> NgramLanguageModel for BackoffLm<S>
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
        scoring::ngram_log_prob_by_context(self, ngram)
    }

    fn score_sentence(&self, sentence: &[&str]) -> f32 {
        scoring::score_sentence_by_context(self, sentence)
    }
}

impl<S> ContextEncodedLm for BackoffLm<S>
where
    S: NgramIndex + ProbBackoffValues,
{
    fn log_prob(&self, context: LmContext, word: WordId) -> f32 {
        self.score(context, word, false).0
    }

    fn log_prob_with_context(&self, context: LmContext, word: WordId) -> (f32, Option<LmContext>) {
        self.score(context, word, true)
    }

    fn context_for_ngram(&self, ngram: &[WordId]) -> LmContext {
        let max_len = self.lm_order - 1;
        self.store
            .context_for_ngram(&ngram[ngram.len().saturating_sub(max_len)..])
    }

    fn ngram_for_context(&self, context: LmContext, word: WordId) -> Vec<WordId> {
        self.store.ngram_for_context(context, word)
    }
}

impl<S> std::fmt::Debug for BackoffLm<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffLm")
            .field("lm_order", &self.lm_order)
            .field("vocabulary", &self.vocabulary)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
