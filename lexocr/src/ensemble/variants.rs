use std::collections::BTreeMap;
use std::path::Path;

use image::{GrayImage, Luma};

use crate::config::EnsembleConfig;
use crate::error::{LexError, Result};

/// Binarized copies of one image keyed by skew id (skew × 100).
pub type VariantSet = BTreeMap<u32, GrayImage>;

/// Skew ids to sweep, `start..=end` in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkewRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for SkewRange {
    fn default() -> Self {
        Self {
            start: 50,
            end: 145,
            step: 5,
        }
    }
}

impl SkewRange {
    pub fn new(start: u32, end: u32, step: u32) -> Result<Self> {
        if step == 0 {
            return Err(LexError::Validation("Skew step must be positive".to_string()));
        }
        if start == 0 || end >= 1000 || start > end {
            return Err(LexError::Validation(format!(
                "Skew range {start}..={end} must lie within 1..=999"
            )));
        }
        Ok(Self { start, end, step })
    }

    pub fn from_config(config: &EnsembleConfig) -> Result<Self> {
        Self::new(config.skew_start, config.skew_end, config.skew_step)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> {
        (self.start..=self.end).step_by(self.step as usize)
    }
}

/// Threshold the image at the midpoint of its extrema scaled by `skew`.
///
/// Pixels strictly above the threshold become white, the rest black.
pub fn binarize(image: &GrayImage, skew: f64) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    let threshold = (min as f64 + max as f64) / 2.0 * skew;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] as f64 > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

pub fn generate_variants(image: &GrayImage, range: &SkewRange) -> VariantSet {
    range
        .ids()
        .map(|id| (id, binarize(image, id as f64 / 100.0)))
        .collect()
}

/// Write every variant to `dir` as `<skew>.png` for inspection.
pub fn dump_variants(variants: &VariantSet, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (id, variant) in variants {
        variant.save(dir.join(format!("{id}.png")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32) -> GrayImage {
        GrayImage::from_fn(width, 1, |x, _| Luma([(x * 255 / (width - 1)) as u8]))
    }

    #[test]
    fn test_default_range_has_twenty_variants() {
        let ids: Vec<u32> = SkewRange::default().ids().collect();
        assert_eq!(ids.len(), 20);
        assert_eq!(ids.first(), Some(&50));
        assert_eq!(ids.last(), Some(&145));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(SkewRange::new(50, 145, 0).is_err());
        assert!(SkewRange::new(0, 145, 5).is_err());
        assert!(SkewRange::new(50, 1000, 5).is_err());
        assert!(SkewRange::new(150, 50, 5).is_err());
    }

    #[test]
    fn test_binarize_uses_midpoint_of_extrema() {
        // extrema 20 and 220: threshold 120 at skew 1.0
        let image = GrayImage::from_raw(4, 1, vec![20, 120, 121, 220]).unwrap();
        let bin = binarize(&image, 1.0);
        assert_eq!(bin.into_raw(), vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_binarize_skew_shifts_threshold() {
        // threshold 60 at skew 0.5, 180 at skew 1.5
        let image = GrayImage::from_raw(4, 1, vec![20, 100, 170, 220]).unwrap();
        assert_eq!(binarize(&image, 0.5).into_raw(), vec![0, 255, 255, 255]);
        assert_eq!(binarize(&image, 1.5).into_raw(), vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_binarize_output_is_two_level() {
        let bin = binarize(&gradient(64), 0.85);
        assert!(bin.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_higher_skew_never_adds_white() {
        let image = gradient(128);
        let variants = generate_variants(&image, &SkewRange::default());
        let whites: Vec<usize> = variants
            .values()
            .map(|v| v.pixels().filter(|p| p[0] == 255).count())
            .collect();
        assert!(whites.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_dump_variants_writes_one_file_per_skew() {
        let dir = tempfile::tempdir().unwrap();
        let range = SkewRange::new(90, 110, 10).unwrap();
        let variants = generate_variants(&gradient(16), &range);

        dump_variants(&variants, dir.path()).unwrap();
        for id in [90, 100, 110] {
            assert!(dir.path().join(format!("{id}.png")).exists());
        }
    }
}
