use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) if val.trim().is_empty() => None,
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
    pub ensemble: EnsembleConfig,
    pub corpus: CorpusConfig,
    pub spelling: SpellingConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language codes, `+`-joined (e.g. `tha`, `tha+eng`)
    pub languages: String,
    /// Optional tessdata directory; Tesseract's default lookup is used when unset
    pub data_path: Option<String>,
    /// Bound on a single recognition call
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

/// Tuning of the ensemble: variant sweep and ranking cutoffs.
///
/// The cutoffs are empirically tuned; the defaults reproduce the
/// behaviour the ranking was calibrated against.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    pub skew_start: u32,
    /// Inclusive upper bound of the sweep
    pub skew_end: u32,
    pub skew_step: u32,
    pub noise_ratio: f64,
    pub default_floor: f64,
    pub candidate_cap: usize,
    /// When set, every binarized variant is written here as `<skew>.png`
    pub variant_dump_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    pub path: PathBuf,
    /// Number of corpora kept in memory between passes; 0 reloads every pass
    pub cache_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellingConfig {
    pub max_distance: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "tha".to_string(),
            data_path: None,
            timeout_secs: 30,
            max_image_dimension: 4096,
            min_image_dimension: 8,
        }
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            skew_start: 50,
            skew_end: 145,
            skew_step: 5,
            noise_ratio: 0.04,
            default_floor: 0.01,
            candidate_cap: 3,
            variant_dump_dir: None,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("lexitron_thai.txt"),
            cache_size: 0,
        }
    }
}

impl Default for SpellingConfig {
    fn default() -> Self {
        Self { max_distance: 2 }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dict.longdo.com/search/".to_string(),
            timeout_secs: 15,
            max_attempts: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr = OcrConfig::default();
        let ensemble = EnsembleConfig::default();
        let corpus = CorpusConfig::default();
        let spelling = SpellingConfig::default();
        let lookup = LookupConfig::default();

        Self {
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr.languages),
                data_path: env::var("OCR_DATA_PATH").ok(),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr.timeout_secs),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", ocr.max_image_dimension),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", ocr.min_image_dimension),
            },
            ensemble: EnsembleConfig {
                skew_start: parse_env_or("ENSEMBLE_SKEW_START", ensemble.skew_start),
                skew_end: parse_env_or("ENSEMBLE_SKEW_END", ensemble.skew_end),
                skew_step: parse_env_or("ENSEMBLE_SKEW_STEP", ensemble.skew_step),
                noise_ratio: parse_env_or("ENSEMBLE_NOISE_RATIO", ensemble.noise_ratio),
                default_floor: parse_env_or("ENSEMBLE_DEFAULT_FLOOR", ensemble.default_floor),
                candidate_cap: parse_env_or("ENSEMBLE_CANDIDATE_CAP", ensemble.candidate_cap),
                variant_dump_dir: parse_env_opt("ENSEMBLE_VARIANT_DUMP_DIR"),
            },
            corpus: CorpusConfig {
                path: parse_env_opt("CORPUS_PATH").unwrap_or(corpus.path),
                cache_size: parse_env_or("CORPUS_CACHE_SIZE", corpus.cache_size),
            },
            spelling: SpellingConfig {
                max_distance: parse_env_or("SPELLING_MAX_DISTANCE", spelling.max_distance),
            },
            lookup: LookupConfig {
                base_url: env::var("LOOKUP_BASE_URL").unwrap_or(lookup.base_url),
                timeout_secs: parse_env_or("LOOKUP_TIMEOUT", lookup.timeout_secs),
                max_attempts: parse_env_or("LOOKUP_MAX_ATTEMPTS", lookup.max_attempts),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
