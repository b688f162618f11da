//! Container formats: TIFF parsing and patching, plus path classification.
//!
//! # Format Detection
//!
//! Use [`detect::detect_input`] to decide how metadata is read from an input
//! file and [`detect::OutputTarget::classify`] to decide how it is written.

pub mod detect;
pub mod tiff;

pub use detect::{detect_input, is_tiff_header, InputFormat, OutputTarget};
