//! Sentence and phrase scoring shared by every model.
//!
//! Input words are mapped to ids according to the model's
//! [`UnknownWordPolicy`]. Under [`UnknownWordPolicy::Constant`] an unknown word
//! is charged the OOV constant directly and no context reaches across it.

use tracing::trace;

use crate::config::UnknownWordPolicy;
use crate::lm::{ContextEncodedLm, LmContext, NgramLanguageModel};
use crate::vocab::WordId;

/// Map words to ids. `None` marks an unknown word under the `Constant` policy.
fn word_ids<L>(lm: &L, words: &[&str]) -> Vec<Option<WordId>>
where
    L: NgramLanguageModel + ?Sized,
{
    let vocab = lm.vocabulary();
    match lm.config().unknown_words {
        UnknownWordPolicy::UnkTag => words
            .iter()
            .map(|w| Some(vocab.id_possibly_unk(w)))
            .collect(),
        UnknownWordPolicy::Constant => words.iter().map(|w| vocab.id(w)).collect(),
    }
}

/// `<s> words... </s>` as ids.
fn bounded_word_ids<L>(lm: &L, sentence: &[&str]) -> Vec<Option<WordId>>
where
    L: NgramLanguageModel + ?Sized,
{
    let vocab = lm.vocabulary();
    let mut ids = Vec::with_capacity(sentence.len() + 2);
    ids.push(Some(vocab.start_id()));
    ids.extend(word_ids(lm, sentence));
    ids.push(Some(vocab.end_id()));
    ids
}

/// Sum the window score of every position from `first` on. Windows never
/// reach back past an unknown word.
fn sum_windows<L>(lm: &L, ids: &[Option<WordId>], first: usize) -> f32
where
    L: NgramLanguageModel + ?Sized,
{
    let lm_order = lm.lm_order();
    let mut window: Vec<WordId> = Vec::with_capacity(lm_order);
    let mut window_start = 0;
    let mut score = 0.0f32;

    for i in first..ids.len() {
        if ids[i].is_none() {
            score += lm.oov_word_log_prob();
            window_start = i + 1;
            continue;
        }
        let start = window_start.max((i + 1).saturating_sub(lm_order));
        window.clear();
        window.extend(ids[start..=i].iter().flatten());
        score += lm.ngram_log_prob(&window);
    }
    score
}

/// Score a sentence by sliding an `lm_order` window over
/// `<s> sentence </s>` and summing the n-gram scores. `<s>` itself is not
/// scored.
pub fn score_sentence_by_windows<L>(lm: &L, sentence: &[&str]) -> f32
where
    L: NgramLanguageModel + ?Sized,
{
    let ids = bounded_word_ids(lm, sentence);
    let score = sum_windows(lm, &ids, 1);
    trace!("scored {} words by windows: {}", sentence.len(), score);
    score
}

/// Score a sentence in one left-to-right pass, feeding each word's
/// continuation context into the next lookup.
pub fn score_sentence_by_context<L>(lm: &L, sentence: &[&str]) -> f32
where
    L: ContextEncodedLm + ?Sized,
{
    let ids = bounded_word_ids(lm, sentence);
    let mut context = lm.context_for_ngram(&[lm.vocabulary().start_id()]);
    let mut score = 0.0f32;

    for id in &ids[1..] {
        match *id {
            Some(word) => {
                let (log_prob, next) = lm.log_prob_with_context(context, word);
                score += log_prob;
                context = next.unwrap_or(LmContext::EMPTY);
            }
            None => {
                score += lm.oov_word_log_prob();
                context = LmContext::EMPTY;
            }
        }
    }

    trace!("scored {} words by context: {}", sentence.len(), score);
    score
}

/// Log probability of the last word of `phrase` given the words before it.
pub fn phrase_log_prob<L>(lm: &L, phrase: &[&str]) -> f32
where
    L: NgramLanguageModel + ?Sized,
{
    let Some(last) = phrase.len().checked_sub(1) else {
        return 0.0;
    };
    let ids = word_ids(lm, phrase);
    if ids[last].is_none() {
        return lm.oov_word_log_prob();
    }
    // Keep only the words after the last unknown one
    let start = ids[..last]
        .iter()
        .rposition(Option::is_none)
        .map_or(0, |i| i + 1);
    let ngram: Vec<WordId> = ids[start..].iter().flatten().copied().collect();
    lm.ngram_log_prob(&ngram)
}

/// Score the last word of `ngram` by encoding the words before it as a
/// context. Only the last `lm_order` words are considered.
///
/// # Panics
/// Panics if `ngram` is empty.
pub fn ngram_log_prob_by_context<L>(lm: &L, ngram: &[WordId]) -> f32
where
    L: ContextEncodedLm + ?Sized,
{
    let Some((&word, context_words)) = ngram.split_last() else {
        panic!("cannot score an empty n-gram");
    };
    let context = lm.context_for_ngram(context_words);
    lm.log_prob(context, word)
}
