//! OCR engine boundary
//!
//! The ensemble never talks to Tesseract directly. It goes through the
//! [`Recognizer`] trait, which takes one grayscale raster, one
//! [`RecognitionMode`] and a language code and returns the trimmed text.
//!
//! # Architecture
//!
//! - `Recognizer` trait defines the interface (test doubles implement it too)
//! - `TesseractRecognizer` implements it via leptess, pooling one engine per
//!   concurrent caller and bounding every call with a timeout
//! - `load_grayscale` turns uploaded bytes into the raster the ensemble binarizes
//!
//! # Configuration
//!
//! OCR behavior is controlled via `OcrConfig` (see `config.rs`):
//! - `languages`: `+`-joined Tesseract language codes
//! - `data_path`: tessdata directory override
//! - `timeout_secs`: bound on a single recognition call
//! - `max/min_image_dimension`: size limits for input validation

mod mode;
mod preprocessing;
mod provider;

pub use mode::{RecognitionKind, RecognitionMode};
pub use preprocessing::{encode_png, load_grayscale};
pub use provider::{Recognizer, TesseractRecognizer};
