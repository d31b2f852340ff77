use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::GrayImage;
use leptess::{LepTess, Variable};
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{LexError, Result};

use super::mode::RecognitionMode;
use super::preprocessing::encode_png;

/// The external engine boundary: one image, one layout assumption, one language.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(
        &self,
        image: &GrayImage,
        mode: RecognitionMode,
        language: &str,
    ) -> Result<String>;
}

/// Idle Tesseract engines keyed by language.
///
/// An engine is checked out for exactly one call, so concurrent workers
/// never share one; the pool grows to the peak concurrency it sees.
struct EnginePool {
    idle: Mutex<HashMap<String, Vec<LepTess>>>,
    data_path: Option<String>,
}

impl EnginePool {
    fn checkout(&self, language: &str) -> Result<LepTess> {
        let pooled = self
            .idle
            .lock()
            .map_err(|_| LexError::Internal("Tesseract pool lock poisoned".to_string()))?
            .get_mut(language)
            .and_then(Vec::pop);

        match pooled {
            Some(engine) => Ok(engine),
            None => {
                debug!(language, "Creating Tesseract engine");
                LepTess::new(self.data_path.as_deref(), language).map_err(|e| {
                    LexError::OcrUnavailable(format!(
                        "Failed to initialize Tesseract for '{language}': {e}"
                    ))
                })
            }
        }
    }

    fn checkin(&self, language: &str, engine: LepTess) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.entry(language.to_string()).or_default().push(engine);
        }
    }
}

enum OcrBackend {
    Local { pool: Arc<EnginePool> },
    Unavailable { reason: String },
}

pub struct TesseractRecognizer {
    backend: OcrBackend,
    config: OcrConfig,
}

impl TesseractRecognizer {
    /// Warms the pool with one engine for the configured languages.
    ///
    /// A missing Tesseract install or language pack does not fail
    /// construction; the recognizer reports itself unavailable instead.
    pub fn new(config: &OcrConfig) -> Self {
        let pool = EnginePool {
            idle: Mutex::new(HashMap::new()),
            data_path: config.data_path.clone(),
        };

        let backend = match pool.checkout(&config.languages) {
            Ok(engine) => {
                pool.checkin(&config.languages, engine);
                info!(languages = %config.languages, "Tesseract OCR initialized");
                OcrBackend::Local {
                    pool: Arc::new(pool),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    async fn recognize_internal(
        &self,
        image: &GrayImage,
        mode: RecognitionMode,
        language: &str,
    ) -> Result<String> {
        let pool = match &self.backend {
            OcrBackend::Local { pool } => Arc::clone(pool),
            OcrBackend::Unavailable { reason } => {
                return Err(LexError::OcrUnavailable(reason.clone()))
            }
        };

        let png = encode_png(image)?;
        let language = language.to_string();

        let text = tokio::task::spawn_blocking(move || {
            let mut engine = pool.checkout(&language)?;
            let result = run_engine(&mut engine, &png, mode);
            pool.checkin(&language, engine);
            result
        })
        .await
        .map_err(|e| LexError::Ocr(format!("OCR task panicked: {e}")))??;

        Ok(text.trim().to_string())
    }
}

fn run_engine(engine: &mut LepTess, png: &[u8], mode: RecognitionMode) -> Result<String> {
    engine
        .set_variable(Variable::TesseditPagesegMode, &mode.code().to_string())
        .map_err(|e| LexError::Ocr(format!("Failed to set {mode}: {e}")))?;
    engine
        .set_image_from_mem(png)
        .map_err(|e| LexError::Ocr(format!("Failed to set image: {e}")))?;
    engine
        .get_utf8_text()
        .map_err(|e| LexError::Ocr(format!("Failed to extract text: {e}")))
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        image: &GrayImage,
        mode: RecognitionMode,
        language: &str,
    ) -> Result<String> {
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        let result =
            tokio::time::timeout(timeout_duration, self.recognize_internal(image, mode, language))
                .await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => Err(LexError::Ocr(format!(
                "OCR operation timed out after {} seconds",
                self.config.timeout_secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(languages: &str) -> OcrConfig {
        OcrConfig {
            languages: languages.to_string(),
            data_path: None,
            timeout_secs: 30,
            max_image_dimension: 4096,
            min_image_dimension: 8,
        }
    }

    #[test]
    fn test_recognizer_graceful_degradation() {
        // Either outcome is fine; construction must not panic without tessdata
        let recognizer = TesseractRecognizer::new(&make_config("tha"));
        let _ = recognizer.is_available();
    }

    #[test]
    fn test_unknown_language_is_unavailable() {
        let recognizer = TesseractRecognizer::new(&make_config("no-such-language-pack"));
        assert!(!recognizer.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_returns_error() {
        let recognizer = TesseractRecognizer {
            backend: OcrBackend::Unavailable {
                reason: "Test unavailable".to_string(),
            },
            config: make_config("tha"),
        };

        let image = GrayImage::new(10, 10);
        let result = recognizer
            .recognize(&image, RecognitionMode::SingleLine, "tha")
            .await;
        assert!(matches!(result, Err(LexError::OcrUnavailable(_))));
    }
}
