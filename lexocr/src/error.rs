use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Failed to load corpus from {}: {source}", path.display())]
    Corpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for LexError {
    fn from(e: image::ImageError) -> Self {
        LexError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LexError>;
