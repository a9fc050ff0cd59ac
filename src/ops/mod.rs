//! High-level operations.

pub mod gen_enums;

pub use gen_enums::{gen_enums, generate_source, GenOptions, GenOutcome, Generated};
