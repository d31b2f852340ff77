pub mod config;
pub mod ensemble;
pub mod error;
pub mod lookup;
pub mod ocr;
pub mod spelling;
