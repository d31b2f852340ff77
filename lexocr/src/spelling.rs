//! Spell correction for ensemble candidates
//!
//! The ranker only needs `correct(text) -> text`. `LexiconCorrector` answers
//! it from the same word list used for validation: the closest lexicon word
//! by character edit distance (`strsim::levenshtein`), or the input itself
//! when nothing is close.

use std::collections::HashSet;

use crate::ensemble::Corpus;

pub trait SpellCorrector: Send + Sync {
    fn correct(&self, text: &str) -> String;
}

impl<F> SpellCorrector for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn correct(&self, text: &str) -> String {
        self(text)
    }
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCorrector;

impl SpellCorrector for IdentityCorrector {
    fn correct(&self, text: &str) -> String {
        text.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct LexiconCorrector {
    words: Vec<String>,
    known: HashSet<String>,
    max_distance: usize,
}

impl LexiconCorrector {
    /// Words are taken in order of first appearance; earlier words win ties.
    pub fn from_words<I, S>(words: I, max_distance: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known = HashSet::new();
        let mut ordered = Vec::new();
        for word in words {
            let word = word.into();
            if !word.is_empty() && known.insert(word.clone()) {
                ordered.push(word);
            }
        }
        Self {
            words: ordered,
            known,
            max_distance,
        }
    }

    /// Every whitespace-separated token of every corpus line is a word.
    pub fn from_corpus(corpus: &Corpus, max_distance: usize) -> Self {
        Self::from_words(
            corpus.lines().flat_map(str::split_whitespace),
            max_distance,
        )
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl SpellCorrector for LexiconCorrector {
    fn correct(&self, text: &str) -> String {
        if text.is_empty() || self.known.contains(text) {
            return text.to_string();
        }

        let input_len = text.chars().count();
        let mut best: Option<(usize, &str)> = None;

        for word in &self.words {
            let limit = best.map_or(self.max_distance, |(d, _)| d.saturating_sub(1));
            if word.chars().count().abs_diff(input_len) > limit {
                continue;
            }
            let distance = strsim::levenshtein(text, word);
            if distance <= limit {
                best = Some((distance, word.as_str()));
                if distance == 1 {
                    break;
                }
            }
        }

        best.map_or_else(|| text.to_string(), |(_, word)| word.to_string())
    }
}
