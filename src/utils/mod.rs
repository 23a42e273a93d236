//! Shared helpers

pub mod filename;

pub use filename::{format_clock, recording_filename, PRODUCT_NAME};
