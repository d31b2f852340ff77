#![allow(dead_code)]

use std::io::Write;
use std::sync::Once;

use image::{GrayImage, Luma};
use tempfile::NamedTempFile;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Horizontal gradient from 10 to 244; always contains mid-gray pixels.
pub fn gradient_image() -> GrayImage {
    GrayImage::from_fn(40, 12, |x, _| Luma([10 + (x * 6) as u8]))
}

/// True for rasters that went through binarization.
pub fn is_binarized(image: &GrayImage) -> bool {
    image.pixels().all(|p| p[0] == 0 || p[0] == 255)
}

pub fn corpus_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create corpus file");
    for line in lines {
        writeln!(file, "{line}").expect("Failed to write corpus line");
    }
    file
}

pub use serial_test::serial;
pub use tempfile;
