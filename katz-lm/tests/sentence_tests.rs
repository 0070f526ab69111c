//! Integration tests for sentence scoring over a generated trigram model.

use katz_lm::{
    ArrayBackoffLm, BackoffLm, ContextEncodedLm, LmBuilder, LmConfig, LmContext, LmError,
    NgramLanguageModel, UnknownWordPolicy, WordId,
};

// ============================================================================
// Helper functions
// ============================================================================

const WORDS: [&str; 8] = ["the", "cat", "sat", "on", "a", "mat", "dog", "ran"];

/// Small deterministic generator so the model is the same on every run.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }

    /// A log10 value in `[lo, hi)` on a 1/64 grid.
    fn log_value(&mut self, lo: f32, hi: f32) -> f32 {
        let steps = ((hi - lo) * 64.0) as u64;
        lo + (self.next() % steps) as f32 / 64.0
    }
}

/// Trigram model in which every prefix and suffix of a stored n-gram also
/// carries a probability, as in a well-formed backoff model.
fn generated_builder(seed: u64) -> LmBuilder {
    let mut rng = Lcg(seed);
    let mut builder = LmBuilder::new(3);
    let mut vocab: Vec<&str> = vec!["<s>", "</s>"];
    vocab.extend(WORDS);

    for &word in &vocab {
        let prob = if word == "<s>" {
            -99.0
        } else {
            rng.log_value(-3.0, -0.5)
        };
        builder
            .add_ngram(&[word], prob, Some(rng.log_value(-1.0, 0.0)))
            .unwrap();
    }

    let mut bigrams: Vec<(&str, &str)> = Vec::new();
    for &x in &vocab {
        for &y in &vocab {
            if y == "<s>" || x == "</s>" || !rng.chance(35) {
                continue;
            }
            builder
                .add_ngram(&[x, y], rng.log_value(-2.0, -0.1), Some(rng.log_value(-1.0, 0.0)))
                .unwrap();
            bigrams.push((x, y));
        }
    }

    for &(x, y) in &bigrams {
        for &(y2, z) in &bigrams {
            if y2 != y || !rng.chance(40) {
                continue;
            }
            builder
                .add_ngram(&[x, y, z], rng.log_value(-1.5, -0.05), None)
                .unwrap();
        }
    }
    builder
}

fn sentences() -> Vec<Vec<&'static str>> {
    let mut rng = Lcg(7);
    let mut out = vec![Vec::new(), vec!["the", "cat", "sat", "on", "the", "mat"]];
    for _ in 0..40 {
        let len = 1 + (rng.next() % 12) as usize;
        out.push(
            (0..len)
                .map(|_| WORDS[(rng.next() % WORDS.len() as u64) as usize])
                .collect(),
        );
    }
    out
}

fn assert_close(actual: f32, expected: f32, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "{what}: expected {expected}, got {actual}"
    );
}

fn bounded_ids(lm: &BackoffLm, sentence: &[&str]) -> Vec<WordId> {
    let vocab = lm.vocabulary();
    let mut ids = vec![vocab.start_id()];
    ids.extend(sentence.iter().map(|w| vocab.id_possibly_unk(w)));
    ids.push(vocab.end_id());
    ids
}

// ============================================================================
// Sentence scoring
// ============================================================================

#[test]
fn test_context_and_array_models_agree() {
    for seed in [1, 2, 3] {
        let builder = generated_builder(seed);
        let context_lm: BackoffLm = builder.clone().build().unwrap();
        let array_lm: ArrayBackoffLm = builder.build_array().unwrap();
        for sentence in sentences() {
            assert_close(
                context_lm.score_sentence(&sentence),
                array_lm.score_sentence(&sentence),
                &format!("seed {seed}, {sentence:?}"),
            );
        }
    }
}

#[test]
fn test_chained_and_windowed_scoring_agree() {
    let lm = generated_builder(11).build().unwrap();
    for sentence in sentences() {
        assert_close(
            katz_lm::scoring::score_sentence_by_context(&lm, &sentence),
            katz_lm::scoring::score_sentence_by_windows(&lm, &sentence),
            &format!("{sentence:?}"),
        );
    }
}

#[test]
fn test_sentence_score_is_sum_of_ngram_scores() {
    let lm = generated_builder(5).build().unwrap();
    let sentence = ["the", "dog", "ran", "on", "a", "mat"];
    let ids = bounded_ids(&lm, &sentence);
    let expected: f32 = (1..ids.len())
        .map(|i| lm.ngram_log_prob(&ids[i.saturating_sub(2)..=i]))
        .sum();
    assert_close(lm.score_sentence(&sentence), expected, "sum");
}

/// The context handed back after each word equals the context encoded
/// directly from the words seen so far.
#[test]
fn test_continuation_context_matches_reencoded_prefix() {
    for seed in [1, 4, 9] {
        let lm = generated_builder(seed).build().unwrap();
        for sentence in sentences() {
            let ids = bounded_ids(&lm, &sentence);
            let mut context = lm.context_for_ngram(&ids[..1]);
            for i in 1..ids.len() {
                let (score, next) = lm.log_prob_with_context(context, ids[i]);
                let next = next.expect("every word has a unigram");
                let reencoded = lm.context_for_ngram(&ids[..=i]);
                assert_eq!(next, reencoded, "seed {seed}, {sentence:?} at {i}");
                assert_eq!(score, lm.ngram_log_prob(&ids[i.saturating_sub(2)..=i]));
                context = next;
            }
        }
    }
}

#[test]
fn test_unknown_words_under_both_policies() {
    let unk_lm = generated_builder(3).build().unwrap();
    let constant_lm = generated_builder(3)
        .with_config(LmConfig {
            oov_word_log_prob: -50.0,
            unknown_words: UnknownWordPolicy::Constant,
        })
        .build()
        .unwrap();

    // No <unk> unigram in the generated model: the scorer's constant applies
    let unk = unk_lm.vocabulary().unk_id();
    assert_eq!(unk_lm.log_prob(LmContext::EMPTY, unk), -100.0);

    let with_oov = ["the", "zebra", "sat"];
    let constant_score = constant_lm.score_sentence(&with_oov);
    // zebra costs the constant, then "sat" restarts from the empty context
    let vocab = constant_lm.vocabulary();
    let the = vocab.id("the").unwrap();
    let sat = vocab.id("sat").unwrap();
    let expected = constant_lm.ngram_log_prob(&[vocab.start_id(), the])
        - 50.0
        + constant_lm.ngram_log_prob(&[sat])
        + constant_lm.ngram_log_prob(&[sat, vocab.end_id()]);
    assert_close(constant_score, expected, "constant policy");

    let array_lm = generated_builder(3)
        .with_config(LmConfig {
            oov_word_log_prob: -50.0,
            unknown_words: UnknownWordPolicy::Constant,
        })
        .build_array()
        .unwrap();
    assert_close(array_lm.score_sentence(&with_oov), expected, "array constant policy");
}

#[test]
fn test_phrase_log_prob_is_last_word_given_rest() {
    let lm = generated_builder(2).build().unwrap();
    let vocab = lm.vocabulary();
    let phrase = ["on", "the", "mat"];
    let ids: Vec<WordId> = phrase.iter().map(|w| vocab.id(w).unwrap()).collect();
    assert_eq!(lm.phrase_log_prob(&phrase), lm.ngram_log_prob(&ids));
}

// ============================================================================
// Model shape
// ============================================================================

/// Order 3 over {a, b, c}: the trigram (a b c) is stored but its suffix
/// (b c) is not, so (b c) only exists without a probability.
fn missing_suffix_builder() -> LmBuilder {
    let mut builder = LmBuilder::new(3);
    builder.add_ngram(&["<s>"], -99.0, Some(-0.5)).unwrap();
    builder.add_ngram(&["</s>"], -1.5, None).unwrap();
    builder.add_ngram(&["a"], -1.25, Some(-0.25)).unwrap();
    builder.add_ngram(&["b"], -1.5, Some(-0.375)).unwrap();
    builder.add_ngram(&["c"], -2.0, Some(-0.125)).unwrap();
    builder.add_ngram(&["<s>", "a"], -0.5, Some(-0.5)).unwrap();
    builder.add_ngram(&["a", "b"], -0.75, Some(-0.25)).unwrap();
    builder.add_ngram(&["a", "b", "c"], -0.25, None).unwrap();
    builder
}

#[test]
fn test_trigram_without_bigram_prefix_is_rejected() {
    let mut builder = LmBuilder::new(3);
    for word in ["<s>", "</s>", "b", "c", "d"] {
        builder.add_ngram(&[word], -1.0, Some(-0.1)).unwrap();
    }
    builder.add_ngram(&["b", "c", "d"], -0.5, None).unwrap();

    assert!(matches!(
        builder.clone().build(),
        Err(LmError::MissingPrefix { .. })
    ));
    assert!(matches!(
        builder.build_array(),
        Err(LmError::MissingPrefix { .. })
    ));
}

#[test]
fn test_missing_suffix_keeps_encodings_in_agreement() {
    let builder = missing_suffix_builder();
    let context_lm: BackoffLm = builder.clone().build().unwrap();
    let array_lm: ArrayBackoffLm = builder.build_array().unwrap();
    let sentences: [&[&str]; 5] = [
        &["a", "b", "c"],
        &["b", "c"],
        &["c", "b", "c", "a"],
        &["a", "b", "c", "b", "c"],
        &["b", "c", "a", "b", "c"],
    ];
    for sentence in sentences {
        let chained = katz_lm::scoring::score_sentence_by_context(&context_lm, sentence);
        let windowed = katz_lm::scoring::score_sentence_by_windows(&context_lm, sentence);
        let array = array_lm.score_sentence(sentence);
        assert_close(chained, windowed, &format!("windowed {sentence:?}"));
        assert_close(chained, array, &format!("array {sentence:?}"));
    }
}

/// The returned context may be shorter than the re-encoded one when the
/// longer one has no probability, but every next word scores the same.
#[test]
fn test_continuation_context_scores_like_reencoded_prefix() {
    let lm = missing_suffix_builder().build().unwrap();
    let all_words: Vec<WordId> = (0..lm.vocabulary().len() as WordId).collect();
    for sentence in [&["b", "c", "a", "b"][..], &["a", "b", "c", "c"]] {
        let ids = bounded_ids(&lm, sentence);
        let mut context = lm.context_for_ngram(&ids[..1]);
        for i in 1..ids.len() {
            let (_, next) = lm.log_prob_with_context(context, ids[i]);
            let next = next.expect("every word has a unigram");
            let reencoded = lm.context_for_ngram(&ids[..=i]);
            for &word in &all_words {
                assert_eq!(
                    lm.log_prob(next, word),
                    lm.log_prob(reencoded, word),
                    "{sentence:?} at {i}, next word {word}"
                );
            }
            context = next;
        }
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_scoring() {
    let lm = generated_builder(8).build().unwrap();
    let sentences = sentences();
    let expected: Vec<f32> = sentences.iter().map(|s| lm.score_sentence(s)).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    sentences
                        .iter()
                        .map(|s| lm.score_sentence(s))
                        .collect::<Vec<f32>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
