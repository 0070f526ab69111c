//! N-gram index and value store.
//!
//! The scorers only see the [`NgramIndex`] and [`ProbBackoffValues`] traits.
//! [`NgramStore`] is an uncompressed in-memory implementation of both.

use std::collections::HashMap;

use tracing::debug;

use crate::lm::LmContext;
use crate::vocab::WordId;

/// Maps `(context, word)` pairs to entry offsets.
///
/// An entry offset at n-gram order `k` is itself a valid context offset at
/// context order `k`.
pub trait NgramIndex: Send + Sync {
    /// Number of n-gram orders stored (the longest n-gram length).
    fn num_orders(&self) -> usize;

    /// Offset of the n-gram formed by the context at
    /// `(context_offset, context_order)` followed by `word`, if stored.
    ///
    /// `context_order == -1` denotes the empty context, in which case
    /// `context_offset` is ignored.
    fn resolve(&self, context_offset: u64, context_order: i32, word: WordId) -> Option<u64>;

    /// Encode the longest suffix of `ngram` that is stored, keeping at most
    /// `num_orders - 1` words.
    fn context_for_ngram(&self, ngram: &[WordId]) -> LmContext {
        let max_len = self.num_orders().saturating_sub(1);
        let tail = &ngram[ngram.len().saturating_sub(max_len)..];
        for start in 0..tail.len() {
            if let Some(offset) = self.lookup(&tail[start..]) {
                return LmContext::new(offset, (tail.len() - start) as i32 - 1);
            }
        }
        LmContext::EMPTY
    }

    /// Decode the words of `context`, followed by `word`.
    ///
    /// # Panics
    /// Panics if `context` does not name a stored n-gram.
    fn ngram_for_context(&self, context: LmContext, word: WordId) -> Vec<WordId>;

    /// Offset of the exact n-gram `ngram`, walking [`NgramIndex::resolve`]
    /// one word at a time.
    fn lookup(&self, ngram: &[WordId]) -> Option<u64> {
        let (&first, rest) = ngram.split_first()?;
        let mut offset = self.resolve(0, -1, first)?;
        for (order, &word) in rest.iter().enumerate() {
            offset = self.resolve(offset, order as i32, word)?;
        }
        Some(offset)
    }
}

/// Per-order probabilities, backoff weights and suffix links.
///
/// Missing values are reported as `None`; how a store encodes absence
/// internally is its own business.
pub trait ProbBackoffValues: Send + Sync {
    /// Log probability of the n-gram at `(ngram_order, offset)`.
    fn prob(&self, ngram_order: usize, offset: u64) -> Option<f32>;

    /// Backoff weight of the n-gram at `(order, offset)` used as a context.
    fn backoff(&self, order: usize, offset: u64) -> Option<f32>;

    /// Offset at `order - 1` of the n-gram at `(order, offset)` with its
    /// earliest word dropped. Unigrams map to `0`.
    fn suffix_offset(&self, offset: u64, order: usize) -> u64;
}

/// One n-gram entry as handed to [`NgramStore::from_entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct NgramEntry {
    pub words: Vec<WordId>,
    pub prob: Option<f32>,
    pub backoff: Option<f32>,
}

/// Storage for the n-grams of a single order. `f32::NAN` marks a missing
/// probability or backoff.
#[derive(Debug, Default)]
struct OrderTable {
    index: HashMap<(u64, WordId), u64>,
    probs: Vec<f32>,
    backoffs: Vec<f32>,
    suffixes: Vec<u64>,
    contexts: Vec<u64>,
    words: Vec<WordId>,
}

impl OrderTable {
    fn len(&self) -> usize {
        self.probs.len()
    }
}

/// Hash-backed n-gram index and value store.
///
/// Offsets are dense per order. Every prefix and every suffix of a stored
/// n-gram is stored too; entries added only to close the set carry no
/// probability and no backoff.
///
/// A prefix closed in this way is a context whose own n-gram misses, so a
/// continuation context never reaches it. [`crate::LmBuilder`] rejects such
/// input; callers building a store directly should supply every prefix.
#[derive(Debug)]
pub struct NgramStore {
    orders: Vec<OrderTable>,
}

impl NgramStore {
    /// Build a store with `num_orders` orders from `entries`.
    ///
    /// Entries longer than `num_orders` or empty are skipped; later
    /// duplicates override earlier ones. Callers validate beforehand.
    pub fn from_entries(num_orders: usize, entries: Vec<NgramEntry>) -> Self {
        let mut values: HashMap<Vec<WordId>, (f32, f32)> = HashMap::new();
        for entry in entries {
            if entry.words.is_empty() || entry.words.len() > num_orders {
                continue;
            }
            values.insert(
                entry.words,
                (
                    entry.prob.unwrap_or(f32::NAN),
                    entry.backoff.unwrap_or(f32::NAN),
                ),
            );
        }

        // Close under prefixes and suffixes
        let explicit: Vec<Vec<WordId>> = values.keys().cloned().collect();
        for words in &explicit {
            for start in 0..words.len() {
                for end in start + 1..=words.len() {
                    if end - start == words.len() {
                        continue;
                    }
                    values
                        .entry(words[start..end].to_vec())
                        .or_insert((f32::NAN, f32::NAN));
                }
            }
        }

        let mut by_order: Vec<Vec<(Vec<WordId>, (f32, f32))>> = vec![Vec::new(); num_orders];
        for (words, v) in values {
            by_order[words.len() - 1].push((words, v));
        }

        let mut offsets: Vec<HashMap<Vec<WordId>, u64>> = Vec::with_capacity(num_orders);
        let mut orders: Vec<OrderTable> = Vec::with_capacity(num_orders);

        for (order, mut ngrams) in by_order.into_iter().enumerate() {
            ngrams.sort_by(|a, b| a.0.cmp(&b.0));

            let mut table = OrderTable::default();
            let mut order_offsets = HashMap::with_capacity(ngrams.len());

            for (offset, (words, (prob, backoff))) in ngrams.into_iter().enumerate() {
                let offset = offset as u64;
                let (&word, context_words) = match words.split_last() {
                    Some(split) => split,
                    None => continue,
                };
                let (context, suffix) = if order == 0 {
                    (0, 0)
                } else {
                    let lower = &offsets[order - 1];
                    (lower[context_words], lower[&words[1..]])
                };

                table.index.insert((context, word), offset);
                table.probs.push(prob);
                table.backoffs.push(backoff);
                table.suffixes.push(suffix);
                table.contexts.push(context);
                table.words.push(word);
                order_offsets.insert(words, offset);
            }

            debug!("order {}: {} n-grams", order + 1, table.len());
            offsets.push(order_offsets);
            orders.push(table);
        }

        Self { orders }
    }

    /// Number of entries stored at the 0-based `order`.
    pub fn order_len(&self, order: usize) -> usize {
        self.orders.get(order).map_or(0, OrderTable::len)
    }
}

fn present(value: f32) -> Option<f32> {
    if value.is_nan() { None } else { Some(value) }
}

impl NgramIndex for NgramStore {
    fn num_orders(&self) -> usize {
        self.orders.len()
    }

    fn resolve(&self, context_offset: u64, context_order: i32, word: WordId) -> Option<u64> {
        let table = self.orders.get((context_order + 1) as usize)?;
        let context = if context_order < 0 { 0 } else { context_offset };
        table.index.get(&(context, word)).copied()
    }

    fn ngram_for_context(&self, context: LmContext, word: WordId) -> Vec<WordId> {
        let mut words = Vec::with_capacity(context.len() + 1);
        let mut offset = context.offset;
        for order in (0..context.len()).rev() {
            let entry = self.orders.get(order).and_then(|table| {
                let i = offset as usize;
                table.words.get(i).zip(table.contexts.get(i))
            });
            let Some((&w, &parent)) = entry else {
                panic!("context {context:?} is not stored");
            };
            words.push(w);
            offset = parent;
        }
        words.reverse();
        words.push(word);
        words
    }
}

impl ProbBackoffValues for NgramStore {
    fn prob(&self, ngram_order: usize, offset: u64) -> Option<f32> {
        let table = self.orders.get(ngram_order)?;
        table.probs.get(offset as usize).copied().and_then(present)
    }

    fn backoff(&self, order: usize, offset: u64) -> Option<f32> {
        let table = self.orders.get(order)?;
        table.backoffs.get(offset as usize).copied().and_then(present)
    }

    fn suffix_offset(&self, offset: u64, order: usize) -> u64 {
        self.orders[order].suffixes[offset as usize]
    }
}
