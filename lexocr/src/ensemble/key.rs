use std::fmt;

use serde::Serialize;

use crate::ocr::RecognitionMode;

const VARIANT_SPAN: u32 = 1000;

/// Identifies one recognition attempt.
///
/// The unbinarized original is stored under the bare mode code; a binarized
/// variant under `mode * 1000 + variant`. Mode codes stay below 14 and
/// variant ids between 1 and 999, so the two ranges cannot overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AttemptKey(u32);

impl AttemptKey {
    pub fn plain(mode: RecognitionMode) -> Self {
        Self(mode.code() as u32)
    }

    /// Panics in debug builds if `variant` falls outside `1..1000`.
    pub fn composite(mode: RecognitionMode, variant: u32) -> Self {
        debug_assert!(
            (1..VARIANT_SPAN).contains(&variant),
            "variant id {variant} outside key space"
        );
        Self(mode.code() as u32 * VARIANT_SPAN + variant)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn mode_code(self) -> u32 {
        if self.0 < VARIANT_SPAN {
            self.0
        } else {
            self.0 / VARIANT_SPAN
        }
    }

    pub fn mode(self) -> Option<RecognitionMode> {
        u8::try_from(self.mode_code())
            .ok()
            .and_then(|code| RecognitionMode::from_code(code).ok())
    }

    pub fn variant(self) -> Option<u32> {
        (self.0 >= VARIANT_SPAN).then_some(self.0 % VARIANT_SPAN)
    }

    pub fn is_original(self) -> bool {
        self.variant().is_none()
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
