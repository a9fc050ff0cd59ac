//! enumgen - typed Go constants from the enumerations of a C header
//!
//! The pipeline reads a header through the host C preprocessor, evaluates
//! every enumerator with C integer semantics, groups the results by name,
//! and renders a formatted Go file.

pub mod codegen;
pub mod enums;
pub mod header;
pub mod ops;
pub mod util;

pub use enums::{EnumGroup, Enums, Member};
pub use header::{EnumTable, HeaderError, HeaderParser, ParsedHeader};
pub use ops::{gen_enums, GenOptions, GenOutcome};
