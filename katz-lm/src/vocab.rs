//! Read-only word <-> id table backed by a double-array trie.

use yada::DoubleArray;
use yada::builder::DoubleArrayBuilder;

use crate::error::{LmError, Result};

/// Integer id of a vocabulary word.
pub type WordId = u32;

pub const START_SYMBOL: &str = "<s>";
pub const END_SYMBOL: &str = "</s>";
pub const UNK_SYMBOL: &str = "<unk>";

// yada reserves the top bit of every stored value.
const MAX_WORDS: usize = (1 << 31) - 1;

/// Maps words to dense ids and back.
///
/// The sentence boundary tags and the unknown-word tag are always present
/// and always take the first three ids.
pub struct Vocabulary {
    trie: DoubleArray<Vec<u8>>,
    words: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from `words`, assigning ids in first-seen order.
    ///
    /// Duplicates are ignored. Empty words are rejected since they cannot be
    /// stored in the trie.
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = vec![
            START_SYMBOL.to_string(),
            END_SYMBOL.to_string(),
            UNK_SYMBOL.to_string(),
        ];
        let mut seen: std::collections::HashSet<String> = ordered.iter().cloned().collect();

        for word in words {
            let word = word.as_ref();
            if word.is_empty() {
                return Err(LmError::Vocabulary("empty word".to_string()));
            }
            if seen.insert(word.to_string()) {
                ordered.push(word.to_string());
            }
        }

        if ordered.len() > MAX_WORDS {
            return Err(LmError::Vocabulary(format!(
                "too many words: {} (max {})",
                ordered.len(),
                MAX_WORDS
            )));
        }

        // The trie builder wants keys sorted by bytes
        let mut keyset: Vec<(&[u8], u32)> = ordered
            .iter()
            .enumerate()
            .map(|(i, w)| (w.as_bytes(), i as u32))
            .collect();
        keyset.sort_by(|a, b| a.0.cmp(b.0));

        let trie_bytes = DoubleArrayBuilder::build(&keyset).ok_or_else(|| {
            LmError::Vocabulary("failed to build double-array trie".to_string())
        })?;

        Ok(Self {
            trie: DoubleArray::new(trie_bytes),
            words: ordered,
        })
    }

    /// Exact lookup. Returns `None` for words outside the vocabulary.
    pub fn id(&self, word: &str) -> Option<WordId> {
        if word.is_empty() {
            return None;
        }
        self.trie.exact_match_search(word.as_bytes())
    }

    /// Lookup that maps unknown words to the `<unk>` id.
    pub fn id_possibly_unk(&self, word: &str) -> WordId {
        self.id(word).unwrap_or(self.unk_id())
    }

    pub fn word(&self, id: WordId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false: the reserved tags are always present.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn start_id(&self) -> WordId {
        0
    }

    pub fn end_id(&self) -> WordId {
        1
    }

    pub fn unk_id(&self) -> WordId {
        2
    }
}

impl std::fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("len", &self.words.len())
            .finish()
    }
}
