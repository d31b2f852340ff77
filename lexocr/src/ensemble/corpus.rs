use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::{debug, info};

use crate::error::{LexError, Result};

use super::key::AttemptKey;
use super::scheduler::OutTexts;

/// Attempts whose text was found in the corpus, same keys as `OutTexts`.
pub type ValidatedWords = BTreeMap<AttemptKey, String>;

/// Reference word list, one entry per line.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    lines: Vec<String>,
}

impl Corpus {
    /// Read the whole corpus file. A missing or non-UTF-8 file is an error:
    /// nothing can be validated without it.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LexError::Corpus {
                path: path.to_path_buf(),
                source,
            })?;
        let corpus = Self::from_lines(content.lines());
        info!(path = %path.display(), entries = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Exact substring containment in any line.
    pub fn contains_substring(&self, text: &str) -> bool {
        self.lines.iter().any(|line| line.contains(text))
    }
}

/// Keep the attempts whose text (longer than one character) occurs
/// verbatim inside some corpus line.
pub fn validate_words(out_texts: &OutTexts, corpus: &Corpus) -> ValidatedWords {
    let validated: ValidatedWords = out_texts
        .iter()
        .filter(|(_, text)| text.chars().count() > 1)
        .filter(|(_, text)| corpus.contains_substring(text))
        .map(|(&key, text)| (key, text.clone()))
        .collect();
    debug!(
        candidates = out_texts.len(),
        validated = validated.len(),
        "Validated recognition results against corpus"
    );
    validated
}

/// LRU cache of loaded corpora keyed by path.
///
/// Uses Arc<Mutex<>> so clones share one cache across requests.
#[derive(Clone)]
pub struct CorpusCache {
    cache: Arc<Mutex<LruCache<PathBuf, Arc<Corpus>>>>,
}

impl CorpusCache {
    /// Returns `None` for a zero capacity, meaning "don't cache".
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub async fn get_or_load(&self, path: &Path) -> Result<Arc<Corpus>> {
        let cached = self.lock()?.get(path).cloned();
        if let Some(corpus) = cached {
            return Ok(corpus);
        }

        let corpus = Arc::new(Corpus::load(path).await?);
        self.lock()?.put(path.to_path_buf(), Arc::clone(&corpus));
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<PathBuf, Arc<Corpus>>>> {
        self.cache
            .lock()
            .map_err(|_| LexError::Internal("Corpus cache lock poisoned".to_string()))
    }
}
