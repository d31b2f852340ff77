//! Ensemble recognition
//!
//! Pipeline for one cropped image:
//! - binarize the image at a range of skews (`variants`)
//! - recognize the original and every variant under every mode concurrently
//!   (`scheduler`)
//! - keep readings that appear in the corpus (`corpus`)
//! - rank readings by how often they were produced (`ranker`)
//!
//! `Ensemble` ties the stages together and returns a `RecognitionContext`.

mod corpus;
mod engine;
mod key;
mod ranker;
mod scheduler;
mod variants;

pub use corpus::{validate_words, Corpus, CorpusCache, ValidatedWords};
pub use engine::{Ensemble, RecognitionContext, VariantReadings};
pub use key::AttemptKey;
pub use ranker::{
    choose_suggestion, frequencies, generate_suggestions, FrequencyTable, RankingThresholds,
    Score, Suggestion,
};
pub use scheduler::{collect_out_texts, schedule, Attempt, AttemptOutcome, OutTexts};
pub use variants::{binarize, dump_variants, generate_variants, SkewRange, VariantSet};
