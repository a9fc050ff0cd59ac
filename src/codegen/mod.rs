//! Go code generation: rendering, formatting and language version lookup.

pub mod format;
pub mod lang;
pub mod render;

pub use format::{
    formatter_for, BuiltinFormatter, CommandFormatter, FormatError, FormatOptions, Formatter,
    FormatterKind,
};
pub use lang::{parse_lang_version, query_lang_version};
pub use render::{narrow_u32, RenderError, Renderer};
