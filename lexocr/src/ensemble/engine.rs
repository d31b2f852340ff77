use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::GrayImage;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{LexError, Result};
use crate::ocr::{RecognitionKind, RecognitionMode, Recognizer};
use crate::spelling::SpellCorrector;

use super::corpus::{validate_words, Corpus, CorpusCache, ValidatedWords};
use super::ranker::{generate_suggestions, RankingThresholds, Suggestion};
use super::scheduler::{collect_out_texts, schedule, Attempt, OutTexts};
use super::variants::{dump_variants, generate_variants, SkewRange};

enum CorpusSource {
    File {
        path: PathBuf,
        cache: Option<CorpusCache>,
    },
    Preloaded(Arc<Corpus>),
}

/// Everything one recognition request produced.
///
/// Created per request and handed back to the caller; nothing is kept
/// between requests.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionContext {
    pub language: String,
    pub kind: RecognitionKind,
    pub attempts: Vec<Attempt>,
    #[serde(skip)]
    pub out_texts: OutTexts,
    #[serde(skip)]
    pub validated: ValidatedWords,
    pub suggestions: Vec<Suggestion>,
    pub elapsed_ms: u64,
}

/// Readings of one image (the original or a single variant) across modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantReadings {
    /// `None` for the unbinarized original
    pub variant: Option<u32>,
    pub readings: Vec<(RecognitionMode, String)>,
}

impl RecognitionContext {
    pub fn best(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.text().is_none()).count()
    }

    /// Group successful readings by image, original first, then variants
    /// in ascending skew order. Line breaks are flattened for display.
    pub fn summary_by_variant(&self) -> Vec<VariantReadings> {
        let mut groups: Vec<VariantReadings> = Vec::new();
        let mut ordered: Vec<&Attempt> = self.attempts.iter().collect();
        ordered.sort_by_key(|a| (a.variant, a.mode));

        for attempt in ordered {
            let Some(text) = attempt.text() else {
                continue;
            };
            let reading = (attempt.mode, text.replace('\n', " "));
            match groups.last_mut() {
                Some(group) if group.variant == attempt.variant => group.readings.push(reading),
                _ => groups.push(VariantReadings {
                    variant: attempt.variant,
                    readings: vec![reading],
                }),
            }
        }
        groups
    }
}

/// Runs the whole pipeline: variants, concurrent recognition, corpus
/// validation and ranking.
pub struct Ensemble {
    recognizer: Arc<dyn Recognizer>,
    corrector: Arc<dyn SpellCorrector>,
    skew_range: SkewRange,
    thresholds: RankingThresholds,
    corpus: CorpusSource,
    variant_dump_dir: Option<PathBuf>,
}

impl Ensemble {
    pub fn new(
        config: &Config,
        recognizer: Arc<dyn Recognizer>,
        corrector: Arc<dyn SpellCorrector>,
    ) -> Result<Self> {
        Ok(Self {
            recognizer,
            corrector,
            skew_range: SkewRange::from_config(&config.ensemble)?,
            thresholds: RankingThresholds::from_config(&config.ensemble),
            corpus: CorpusSource::File {
                path: config.corpus.path.clone(),
                cache: CorpusCache::new(config.corpus.cache_size),
            },
            variant_dump_dir: config.ensemble.variant_dump_dir.clone(),
        })
    }

    /// Validate against an already loaded corpus instead of reading the
    /// corpus file on every pass.
    pub fn with_corpus(mut self, corpus: Arc<Corpus>) -> Self {
        self.corpus = CorpusSource::Preloaded(corpus);
        self
    }

    pub async fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        kind: RecognitionKind,
    ) -> Result<RecognitionContext> {
        let start = Instant::now();
        let original = Arc::new(image.clone());

        let source = Arc::clone(&original);
        let range = self.skew_range;
        let variants = tokio::task::spawn_blocking(move || generate_variants(&source, &range))
            .await
            .map_err(|e| LexError::Internal(format!("Variant generation panicked: {e}")))?;

        if let Some(dir) = &self.variant_dump_dir {
            if let Err(e) = dump_variants(&variants, dir) {
                warn!(dir = %dir.display(), error = %e, "Failed to write variants");
            }
        }

        let modes = kind.modes();
        info!(
            %kind,
            language,
            modes = modes.len(),
            variants = variants.len(),
            "Starting ensemble recognition"
        );

        let attempts = schedule(
            Arc::clone(&self.recognizer),
            original,
            Arc::new(variants),
            language,
            &modes,
        )
        .await;
        let out_texts = collect_out_texts(&attempts);

        let corpus = self.load_corpus().await?;
        let validated = validate_words(&out_texts, &corpus);
        let suggestions = generate_suggestions(
            &out_texts,
            &validated,
            &self.thresholds,
            self.corrector.as_ref(),
        );

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            attempts = attempts.len(),
            recognized = out_texts.len(),
            validated = validated.len(),
            suggestions = suggestions.len(),
            elapsed_ms,
            "Ensemble recognition finished"
        );

        Ok(RecognitionContext {
            language: language.to_string(),
            kind,
            attempts,
            out_texts,
            validated,
            suggestions,
            elapsed_ms,
        })
    }

    async fn load_corpus(&self) -> Result<Arc<Corpus>> {
        match &self.corpus {
            CorpusSource::Preloaded(corpus) => Ok(Arc::clone(corpus)),
            CorpusSource::File {
                path,
                cache: Some(cache),
            } => cache.get_or_load(path).await,
            CorpusSource::File { path, cache: None } => Ok(Arc::new(Corpus::load(path).await?)),
        }
    }
}
