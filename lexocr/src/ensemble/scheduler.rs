use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use image::GrayImage;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::ocr::{RecognitionMode, Recognizer};

use super::key::AttemptKey;
use super::variants::VariantSet;

/// Recognized text per attempt. Only successful attempts appear here.
pub type OutTexts = BTreeMap<AttemptKey, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Text(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub key: AttemptKey,
    pub mode: RecognitionMode,
    pub variant: Option<u32>,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Text(text) => Some(text),
            AttemptOutcome::Failed(_) => None,
        }
    }
}

/// Keep the successful attempts, keyed for validation and ranking.
pub fn collect_out_texts(attempts: &[Attempt]) -> OutTexts {
    attempts
        .iter()
        .filter_map(|a| a.text().map(|text| (a.key, text.to_string())))
        .collect()
}

/// Run every mode over the original and all variants.
///
/// One task per mode; each task walks the original and then the variants in
/// order, collecting into its own list. Lists are merged after every task
/// has been joined, so no two tasks ever touch the same storage. A failed
/// call only loses its own attempt, and a panicking task only its own mode.
pub async fn schedule(
    recognizer: Arc<dyn Recognizer>,
    original: Arc<GrayImage>,
    variants: Arc<VariantSet>,
    language: &str,
    modes: &[RecognitionMode],
) -> Vec<Attempt> {
    let handles = modes.iter().map(|&mode| {
        let recognizer = Arc::clone(&recognizer);
        let original = Arc::clone(&original);
        let variants = Arc::clone(&variants);
        let language = language.to_string();
        tokio::spawn(async move {
            run_mode(recognizer.as_ref(), &original, &variants, &language, mode).await
        })
    });

    let results = join_all(handles).await;

    let mut attempts = Vec::with_capacity(modes.len() * (variants.len() + 1));
    for (mode, result) in modes.iter().zip(results) {
        match result {
            Ok(mut mode_attempts) => attempts.append(&mut mode_attempts),
            Err(e) => error!(%mode, error = %e, "Recognition worker did not complete"),
        }
    }
    attempts.sort_by_key(|a| a.key);
    attempts
}

async fn run_mode(
    recognizer: &dyn Recognizer,
    original: &GrayImage,
    variants: &VariantSet,
    language: &str,
    mode: RecognitionMode,
) -> Vec<Attempt> {
    let mut attempts = Vec::with_capacity(variants.len() + 1);
    attempts.push(run_attempt(recognizer, original, language, mode, None).await);
    for (&variant, image) in variants {
        attempts.push(run_attempt(recognizer, image, language, mode, Some(variant)).await);
    }
    debug!(%mode, attempts = attempts.len(), "Recognition worker finished");
    attempts
}

async fn run_attempt(
    recognizer: &dyn Recognizer,
    image: &GrayImage,
    language: &str,
    mode: RecognitionMode,
    variant: Option<u32>,
) -> Attempt {
    let key = match variant {
        Some(variant) => AttemptKey::composite(mode, variant),
        None => AttemptKey::plain(mode),
    };

    let outcome = match recognizer.recognize(image, mode, language).await {
        Ok(text) => AttemptOutcome::Text(text.trim().to_string()),
        Err(e) => {
            warn!(%key, %mode, error = %e, "Recognition attempt failed");
            AttemptOutcome::Failed(e.to_string())
        }
    };

    Attempt {
        key,
        mode,
        variant,
        outcome,
    }
}
