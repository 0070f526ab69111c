//! In-memory model assembly from explicit n-gram entries.

use std::collections::HashSet;

use tracing::debug;

use crate::array::ArrayBackoffLm;
use crate::backoff::BackoffLm;
use crate::config::LmConfig;
use crate::error::{LmError, Result};
use crate::store::{NgramEntry, NgramStore};
use crate::vocab::Vocabulary;

#[derive(Debug, Clone)]
struct PendingNgram {
    words: Vec<String>,
    prob: f32,
    backoff: Option<f32>,
}

/// Collects n-grams with their log10 probabilities and backoff weights and
/// assembles a model from them.
///
/// Adding the same n-gram twice keeps the last values. Every n-gram's
/// prefix must be added as well; its suffixes need not be.
#[derive(Debug, Clone)]
pub struct LmBuilder {
    lm_order: usize,
    config: LmConfig,
    ngrams: Vec<PendingNgram>,
}

impl LmBuilder {
    pub fn new(lm_order: usize) -> Self {
        Self {
            lm_order,
            config: LmConfig::default(),
            ngrams: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lm_order(&self) -> usize {
        self.lm_order
    }

    /// Add an n-gram of 1 to `lm_order` words.
    pub fn add_ngram(&mut self, words: &[&str], prob: f32, backoff: Option<f32>) -> Result<()> {
        if words.is_empty() {
            return Err(LmError::EmptyNgram);
        }
        if words.len() > self.lm_order {
            return Err(LmError::NgramTooLong {
                len: words.len(),
                lm_order: self.lm_order,
            });
        }
        if !prob.is_finite() {
            return Err(LmError::NonFiniteValue {
                what: "probability",
                ngram: words.join(" "),
                value: prob,
            });
        }
        if let Some(value) = backoff.filter(|b| !b.is_finite()) {
            return Err(LmError::NonFiniteValue {
                what: "backoff",
                ngram: words.join(" "),
                value,
            });
        }

        self.ngrams.push(PendingNgram {
            words: words.iter().map(|w| w.to_string()).collect(),
            prob,
            backoff,
        });
        Ok(())
    }

    /// A context is only reachable from a continuation context if it
    /// carries a probability of its own.
    fn check_prefixes(&self) -> Result<()> {
        let known: HashSet<&[String]> = self.ngrams.iter().map(|n| n.words.as_slice()).collect();
        for ngram in &self.ngrams {
            let Some((_, prefix)) = ngram.words.split_last() else {
                continue;
            };
            if !prefix.is_empty() && !known.contains(prefix) {
                return Err(LmError::MissingPrefix {
                    ngram: ngram.words.join(" "),
                    prefix: prefix.join(" "),
                });
            }
        }
        Ok(())
    }

    fn assemble(self) -> Result<(usize, Vocabulary, NgramStore, LmConfig)> {
        if self.lm_order < 1 {
            return Err(LmError::InvalidOrder(self.lm_order));
        }
        self.config.validate()?;
        self.check_prefixes()?;

        let vocab = Vocabulary::new(self.ngrams.iter().flat_map(|n| n.words.iter()))?;
        let entries: Vec<NgramEntry> = self
            .ngrams
            .into_iter()
            .map(|n| NgramEntry {
                words: n.words.iter().map(|w| vocab.id_possibly_unk(w)).collect(),
                prob: Some(n.prob),
                backoff: n.backoff,
            })
            .collect();

        debug!(
            "building order {} model: {} n-grams, {} words",
            self.lm_order,
            entries.len(),
            vocab.len()
        );
        let store = NgramStore::from_entries(self.lm_order, entries);
        Ok((self.lm_order, vocab, store, self.config))
    }

    /// Build a context-encoded model.
    pub fn build(self) -> Result<BackoffLm> {
        let (lm_order, vocab, store, config) = self.assemble()?;
        BackoffLm::new(lm_order, vocab, store, config)
    }

    /// Build an array-encoded model over the same n-grams.
    pub fn build_array(self) -> Result<ArrayBackoffLm> {
        let (lm_order, vocab, store, config) = self.assemble()?;
        ArrayBackoffLm::new(lm_order, vocab, store, config)
    }
}
