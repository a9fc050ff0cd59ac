//! Walk an evaluated enum table and build the output groups.

use thiserror::Error;

use crate::header::{EnumTable, Location};
use crate::util::config::EnumsConfig;

use super::Enums;

/// Where an enumerator goes, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement<'a> {
    /// Emit `name` as a constant of type `group`
    Member { group: &'a str, name: &'a str },
    /// The group is denylisted
    SkippedType { group: &'a str },
    /// The name carries the sentinel suffix
    Sentinel,
    /// Nothing precedes the first `_` of the trimmed name
    EmptyGroup,
}

#[derive(Debug, Error, miette::Diagnostic)]
pub enum CollectError {
    #[error("{location}: enumerator `{name}` has an empty type name after trimming prefix `{prefix}`")]
    #[diagnostic(
        code(enumgen::collect::empty_type_name),
        help("the type name is the text before the first `_`; adjust --prefix or keep such names out of the header")
    )]
    EmptyTypeName {
        name: String,
        prefix: String,
        location: Location,
    },
}

/// Turns enumerators into [`Enums`] groups.
#[derive(Debug, Clone)]
pub struct Collector {
    prefix: String,
    skip_types: Vec<String>,
    sentinel_suffix: String,
}

impl Default for Collector {
    fn default() -> Self {
        Collector::new(&EnumsConfig::default())
    }
}

impl Collector {
    pub fn new(config: &EnumsConfig) -> Self {
        Collector {
            prefix: config.prefix.clone(),
            skip_types: config.skip_types.clone(),
            sentinel_suffix: config.sentinel_suffix.clone(),
        }
    }

    /// Strip the configured prefix, if present.
    fn trim<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }

    fn should_include_type(&self, group: &str) -> bool {
        !self.skip_types.iter().any(|s| s == group)
    }

    /// Decide where the enumerator `name` belongs.
    pub fn place<'a>(&self, name: &'a str) -> Placement<'a> {
        let trimmed = self.trim(name);
        let group = trimmed.split('_').next().unwrap_or(trimmed);

        if !self.should_include_type(group) {
            return Placement::SkippedType { group };
        }
        if !self.sentinel_suffix.is_empty() && trimmed.ends_with(self.sentinel_suffix.as_str()) {
            return Placement::Sentinel;
        }
        if group.is_empty() {
            return Placement::EmptyGroup;
        }
        Placement::Member {
            group,
            name: trimmed,
        }
    }

    /// Group every enumerator of `table`, in declaration order.
    pub fn collect(&self, table: &EnumTable) -> Result<Enums, CollectError> {
        let mut enums = Enums::new();
        let mut skipped = 0usize;

        for constant in table {
            match self.place(&constant.name) {
                Placement::Member { group, name } => enums.add(group, name, constant.value),
                Placement::SkippedType { group } => {
                    tracing::trace!("Skipping {} (type {} is excluded)", constant.name, group);
                    skipped += 1;
                }
                Placement::Sentinel => {
                    tracing::trace!("Skipping sentinel {}", constant.name);
                    skipped += 1;
                }
                Placement::EmptyGroup => {
                    return Err(CollectError::EmptyTypeName {
                        name: constant.name.clone(),
                        prefix: self.prefix.clone(),
                        location: constant.location.clone(),
                    })
                }
            }
        }

        tracing::debug!(
            "Collected {} constants in {} types ({} skipped)",
            enums.member_count(),
            enums.len(),
            skipped
        );
        Ok(enums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{EnumConstant, Location};

    fn table(entries: &[(&str, i64)]) -> EnumTable {
        let mut table = EnumTable::new();
        for (i, (name, value)) in entries.iter().enumerate() {
            table
                .insert(EnumConstant {
                    name: name.to_string(),
                    scope: None,
                    value: *value,
                    location: Location::new("webgpu.h", i as u32 + 1, 5),
                })
                .unwrap();
        }
        table
    }

    fn members(enums: &Enums, group: &str) -> Vec<(String, i64)> {
        enums
            .get(group)
            .map(|g| g.members.iter().map(|m| (m.name.clone(), m.value)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_collects_groups_and_drops_sentinel() {
        let enums = Collector::default().collect(&table(&[
            ("WGPUFoo_A", 0),
            ("WGPUFoo_B", 1),
            ("WGPUFoo_Force32", 0x7fff_ffff),
        ]))
        .unwrap();

        assert_eq!(enums.len(), 1);
        assert_eq!(
            members(&enums, "Foo"),
            vec![("Foo_A".to_string(), 0), ("Foo_B".to_string(), 1)]
        );
    }

    #[test]
    fn test_denylisted_groups_are_skipped() {
        let enums = Collector::default().collect(&table(&[
            ("WGPUSType_Invalid", 0),
            ("WGPUNativeSType_DeviceExtras", 0x0003_0001),
            ("WGPUBackendType_Vulkan", 6),
        ]))
        .unwrap();

        assert!(enums.get("SType").is_none());
        assert!(enums.get("NativeSType").is_none());
        assert_eq!(members(&enums, "BackendType"), vec![("BackendType_Vulkan".to_string(), 6)]);
    }

    #[test]
    fn test_group_key_is_first_segment() {
        let collector = Collector::default();
        assert_eq!(
            collector.place("WGPUTextureFormat_ASTC4x4_UnormSrgb"),
            Placement::Member {
                group: "TextureFormat",
                name: "TextureFormat_ASTC4x4_UnormSrgb"
            }
        );
        // No underscore: the whole trimmed name is the group.
        assert_eq!(
            collector.place("WGPUWholeSize"),
            Placement::Member {
                group: "WholeSize",
                name: "WholeSize"
            }
        );
    }

    #[test]
    fn test_prefix_only_stripped_when_present() {
        let collector = Collector::default();
        assert_eq!(
            collector.place("Native_Thing"),
            Placement::Member {
                group: "Native",
                name: "Native_Thing"
            }
        );
    }

    #[test]
    fn test_custom_config() {
        let config = EnumsConfig {
            prefix: "VK_".to_string(),
            skip_types: vec!["STRUCTURE".to_string()],
            sentinel_suffix: "_MAX_ENUM".to_string(),
        };
        let enums = Collector::new(&config).collect(&table(&[
            ("VK_FORMAT_R8_UNORM", 9),
            ("VK_FORMAT_MAX_ENUM", 0x7fff_ffff),
            ("VK_STRUCTURE_TYPE_APPLICATION_INFO", 0),
        ]))
        .unwrap();
        assert_eq!(enums.len(), 1);
        assert_eq!(members(&enums, "FORMAT"), vec![("FORMAT_R8_UNORM".to_string(), 9)]);
    }

    #[test]
    fn test_trimmed_collisions_are_kept() {
        let enums = Collector::default().collect(&table(&[("WGPUFoo_A", 0), ("Foo_A", 0)]))
        .unwrap();
        assert_eq!(members(&enums, "Foo").len(), 2);
    }

    #[test]
    fn test_empty_sentinel_suffix_disables_filter() {
        let config = EnumsConfig {
            sentinel_suffix: String::new(),
            ..EnumsConfig::default()
        };
        let enums = Collector::new(&config).collect(&table(&[("WGPUFoo_Force32", 1)]))
        .unwrap();
        assert_eq!(members(&enums, "Foo").len(), 1);
    }

    #[test]
    fn test_empty_type_name_is_reported() {
        let collector = Collector::default();
        assert_eq!(collector.place("__FE_DENORM"), Placement::EmptyGroup);
        // Sentinels are dropped before the type name matters.
        assert_eq!(collector.place("WGPU_Force32"), Placement::Sentinel);

        let err = collector
            .collect(&table(&[("WGPUFoo_A", 0), ("__FE_DENORM", 2)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "webgpu.h:2:5: enumerator `__FE_DENORM` has an empty type name after trimming prefix `WGPU`"
        );
    }
}
