use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{LexError, Result};

/// Layout assumption handed to the engine, one per Tesseract page
/// segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum RecognitionMode {
    OsdOnly,
    AutoWithOsd,
    AutoNoOcr,
    Auto,
    SingleColumn,
    SingleBlockVertical,
    SingleBlock,
    SingleLine,
    SingleWord,
    CircleWord,
    SingleChar,
    SparseText,
    SparseTextOsd,
    RawLine,
}

impl RecognitionMode {
    pub const ALL: [RecognitionMode; 14] = [
        RecognitionMode::OsdOnly,
        RecognitionMode::AutoWithOsd,
        RecognitionMode::AutoNoOcr,
        RecognitionMode::Auto,
        RecognitionMode::SingleColumn,
        RecognitionMode::SingleBlockVertical,
        RecognitionMode::SingleBlock,
        RecognitionMode::SingleLine,
        RecognitionMode::SingleWord,
        RecognitionMode::CircleWord,
        RecognitionMode::SingleChar,
        RecognitionMode::SparseText,
        RecognitionMode::SparseTextOsd,
        RecognitionMode::RawLine,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| LexError::Validation(format!("Unknown recognition mode: {code}")))
    }

    pub fn description(self) -> &'static str {
        match self {
            RecognitionMode::OsdOnly => "Orientation and script detection (OSD) only.",
            RecognitionMode::AutoWithOsd => "Automatic page segmentation with OSD.",
            RecognitionMode::AutoNoOcr => {
                "Automatic page segmentation, but no OSD, or OCR."
            }
            RecognitionMode::Auto => "Fully automatic page segmentation, but no OSD.",
            RecognitionMode::SingleColumn => "Assume a single column of text of variable sizes.",
            RecognitionMode::SingleBlockVertical => {
                "Assume a single uniform block of vertically aligned text."
            }
            RecognitionMode::SingleBlock => "Assume a single uniform block of text.",
            RecognitionMode::SingleLine => "Treat the image as a single text line.",
            RecognitionMode::SingleWord => "Treat the image as a single word.",
            RecognitionMode::CircleWord => "Treat the image as a single word in a circle.",
            RecognitionMode::SingleChar => "Treat the image as a single character.",
            RecognitionMode::SparseText => {
                "Sparse text. Find as much text as possible in no particular order."
            }
            RecognitionMode::SparseTextOsd => "Sparse text with OSD.",
            RecognitionMode::RawLine => {
                "Raw line. Treat the image as a single text line, bypassing Tesseract-specific hacks."
            }
        }
    }
}

impl From<RecognitionMode> for u8 {
    fn from(mode: RecognitionMode) -> Self {
        mode.code()
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm {}", self.code())
    }
}

/// What the caller cropped: selects which modes the ensemble exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionKind {
    #[default]
    #[value(alias = "block")]
    Word,
    Line,
    Full,
}

const WORD_MODES: [RecognitionMode; 7] = [
    RecognitionMode::AutoWithOsd,
    RecognitionMode::Auto,
    RecognitionMode::SingleColumn,
    RecognitionMode::SingleBlock,
    RecognitionMode::SparseText,
    RecognitionMode::SparseTextOsd,
    RecognitionMode::RawLine,
];

impl RecognitionKind {
    pub fn modes(self) -> Vec<RecognitionMode> {
        match self {
            RecognitionKind::Word => WORD_MODES.to_vec(),
            RecognitionKind::Line => {
                let mut modes = WORD_MODES.to_vec();
                modes.push(RecognitionMode::SingleLine);
                modes.sort();
                modes
            }
            // Everything that produces text: skips OSD-only and no-OCR segmentation
            RecognitionKind::Full => std::iter::once(RecognitionMode::AutoWithOsd)
                .chain(RecognitionMode::ALL[3..].iter().copied())
                .collect(),
        }
    }
}

impl FromStr for RecognitionKind {
    type Err = LexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "word" | "block" => Ok(RecognitionKind::Word),
            "line" => Ok(RecognitionKind::Line),
            "full" => Ok(RecognitionKind::Full),
            other => Err(LexError::Validation(format!(
                "Unknown recognition kind '{other}', expected word, line or full"
            ))),
        }
    }
}

impl fmt::Display for RecognitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecognitionKind::Word => "word",
            RecognitionKind::Line => "line",
            RecognitionKind::Full => "full",
        };
        f.write_str(name)
    }
}
