//! Grouping of enumerators into generated types.
//!
//! Every enumerator is assigned to an [`EnumGroup`] named after the first
//! underscore-delimited token of its trimmed name. Groups and their members
//! are kept in insertion order until [`Enums::sort`] puts them in output
//! order.

pub mod collect;

pub use collect::{CollectError, Collector};

/// A single generated constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Constant name, e.g. `TextureFormat_R8Unorm`
    pub name: String,
    pub value: i64,
}

/// Constants sharing one generated type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumGroup {
    /// Type name, e.g. `TextureFormat`
    pub name: String,
    pub members: Vec<Member>,
}

impl EnumGroup {
    pub fn new(name: impl Into<String>) -> Self {
        EnumGroup {
            name: name.into(),
            members: Vec::new(),
        }
    }
}

/// All groups collected from a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enums {
    groups: Vec<EnumGroup>,
}

impl Enums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member to `group`, creating the group on first use.
    ///
    /// Members are never de-duplicated.
    pub fn add(&mut self, group: &str, name: impl Into<String>, value: i64) {
        let member = Member {
            name: name.into(),
            value,
        };
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.members.push(member),
            None => {
                let mut new_group = EnumGroup::new(group);
                new_group.members.push(member);
                self.groups.push(new_group);
            }
        }
    }

    /// Order groups by name and members by value, then by name.
    ///
    /// The result depends only on the set of members, never on the order
    /// they were added in.
    pub fn sort(&mut self) {
        self.groups.sort_by(|a, b| a.name.cmp(&b.name));
        for group in &mut self.groups {
            group
                .members
                .sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.name.cmp(&b.name)));
        }
    }

    pub fn groups(&self) -> &[EnumGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&EnumGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnumGroup> {
        self.groups.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of members across all groups.
    pub fn member_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

impl<'a> IntoIterator for &'a Enums {
    type Item = &'a EnumGroup;
    type IntoIter = std::slice::Iter<'a, EnumGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(group: &EnumGroup) -> Vec<&str> {
        group.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_add_groups_by_key() {
        let mut enums = Enums::new();
        enums.add("Foo", "Foo_A", 0);
        enums.add("Bar", "Bar_A", 0);
        enums.add("Foo", "Foo_B", 1);

        assert_eq!(enums.len(), 2);
        assert_eq!(enums.member_count(), 3);
        assert_eq!(names(enums.get("Foo").unwrap()), vec!["Foo_A", "Foo_B"]);
    }

    #[test]
    fn test_add_keeps_duplicates() {
        let mut enums = Enums::new();
        enums.add("Foo", "Foo_A", 0);
        enums.add("Foo", "Foo_A", 0);
        assert_eq!(enums.get("Foo").unwrap().members.len(), 2);
    }

    #[test]
    fn test_sort_orders_groups_and_members() {
        let mut enums = Enums::new();
        enums.add("Zeta", "Zeta_A", 1);
        enums.add("Alpha", "Alpha_C", 3);
        enums.add("Alpha", "Alpha_A", -1);
        enums.add("Alpha", "Alpha_B", 2);
        enums.sort();

        let group_names: Vec<_> = enums.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["Alpha", "Zeta"]);
        assert_eq!(names(&enums.groups()[0]), vec!["Alpha_A", "Alpha_B", "Alpha_C"]);
    }

    #[test]
    fn test_sort_breaks_value_ties_by_name() {
        let mut enums = Enums::new();
        enums.add("Flag", "Flag_None", 0);
        enums.add("Flag", "Flag_Default", 0);
        enums.add("Flag", "Flag_All", 1);
        enums.add("Flag", "Flag_Zero", 0);
        enums.sort();
        assert_eq!(
            names(enums.get("Flag").unwrap()),
            vec!["Flag_Default", "Flag_None", "Flag_Zero", "Flag_All"]
        );

        let mut shuffled = Enums::new();
        shuffled.add("Flag", "Flag_All", 1);
        shuffled.add("Flag", "Flag_Zero", 0);
        shuffled.add("Flag", "Flag_Default", 0);
        shuffled.add("Flag", "Flag_None", 0);
        shuffled.sort();
        assert_eq!(shuffled, enums);
    }

    #[test]
    fn test_negative_values_sort_first() {
        let mut enums = Enums::new();
        enums.add("LogLevel", "LogLevel_Off", 0);
        enums.add("LogLevel", "LogLevel_Neg", -1);
        enums.add("LogLevel", "LogLevel_Error", 1);
        enums.sort();
        assert_eq!(
            names(enums.get("LogLevel").unwrap()),
            vec!["LogLevel_Neg", "LogLevel_Off", "LogLevel_Error"]
        );
    }

    #[test]
    fn test_sort_uses_byte_order() {
        let mut enums = Enums::new();
        enums.add("b", "b", 0);
        enums.add("B", "B", 0);
        enums.add("A", "A", 0);
        enums.sort();
        let group_names: Vec<_> = enums.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["A", "B", "b"]);
    }
}
