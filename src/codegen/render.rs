//! Go source rendering.

use std::fmt::Write as _;

use thiserror::Error;

use crate::enums::Enums;

/// First line of every generated file.
pub const HEADER_COMMENT: &str = "// Code generated by enumgen. DO NOT EDIT.";

#[derive(Debug, Error, miette::Diagnostic)]
pub enum RenderError {
    #[error("value {value} of `{name}` does not fit in uint32")]
    #[diagnostic(
        code(enumgen::render::value_out_of_range),
        help("generated types are uint32; values must lie between -2147483648 and 4294967295")
    )]
    ValueOutOfRange { name: String, value: i64 },
}

/// Narrow an enumerator value to the `uint32` it is emitted as.
///
/// Negative values that fit in `int32` map to their two's complement.
pub fn narrow_u32(value: i64) -> Option<u32> {
    if let Ok(v) = u32::try_from(value) {
        return Some(v);
    }
    i32::try_from(value).ok().map(|v| v as u32)
}

/// Renders sorted [`Enums`] as a Go file.
#[derive(Debug, Clone)]
pub struct Renderer {
    package: String,
}

impl Renderer {
    pub fn new(package: impl Into<String>) -> Self {
        Renderer {
            package: package.into(),
        }
    }

    /// Emit one `type` and one `const` per member, groups in the order given.
    pub fn render(&self, enums: &Enums) -> Result<String, RenderError> {
        let mut output = String::new();

        writeln!(output, "{}", HEADER_COMMENT).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "package {}", self.package).unwrap();
        writeln!(output).unwrap();

        for group in enums {
            writeln!(output, "type {} uint32", group.name).unwrap();
            writeln!(output).unwrap();
            for member in &group.members {
                let value = narrow_u32(member.value).ok_or_else(|| RenderError::ValueOutOfRange {
                    name: member.name.clone(),
                    value: member.value,
                })?;
                writeln!(output, "const {} {} = {}", member.name, group.name, value).unwrap();
            }
            writeln!(output).unwrap();
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_u32() {
        assert_eq!(narrow_u32(0), Some(0));
        assert_eq!(narrow_u32(0x7fff_ffff), Some(0x7fff_ffff));
        assert_eq!(narrow_u32(4_294_967_295), Some(u32::MAX));
        assert_eq!(narrow_u32(-1), Some(4_294_967_295));
        assert_eq!(narrow_u32(i64::from(i32::MIN)), Some(0x8000_0000));
        assert_eq!(narrow_u32(4_294_967_296), None);
        assert_eq!(narrow_u32(i64::from(i32::MIN) - 1), None);
    }

    #[test]
    fn test_render_layout() {
        let mut enums = Enums::new();
        enums.add("Foo", "Foo_A", 0);
        enums.add("Foo", "Foo_B", 1);
        enums.add("Mode", "Mode_Undefined", -1);

        let out = Renderer::new("wgpu").render(&enums).unwrap();
        assert_eq!(
            out,
            "// Code generated by enumgen. DO NOT EDIT.\n\
             \n\
             package wgpu\n\
             \n\
             type Foo uint32\n\
             \n\
             const Foo_A Foo = 0\n\
             const Foo_B Foo = 1\n\
             \n\
             type Mode uint32\n\
             \n\
             const Mode_Undefined Mode = 4294967295\n\
             \n"
        );
    }

    #[test]
    fn test_render_empty() {
        let out = Renderer::new("wgpu").render(&Enums::new()).unwrap();
        assert!(out.ends_with("package wgpu\n\n"));
    }

    #[test]
    fn test_render_rejects_wide_values() {
        let mut enums = Enums::new();
        enums.add("Big", "Big_Value", 1 << 40);
        let err = Renderer::new("wgpu").render(&enums).unwrap_err();
        assert_eq!(err.to_string(), "value 1099511627776 of `Big_Value` does not fit in uint32");
        let code = miette::Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("enumgen::render::value_out_of_range"));
    }
}
