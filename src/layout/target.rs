use crate::config::{LayoutConfig, TypeLayoutSpec};
use std::collections::BTreeMap;

/// Sizes and alignments of builtin types for one target.
///
/// Defaults describe an LP64 target; `layout.types` in the settings adds
/// names or overrides any default.
#[derive(Debug, Clone)]
pub struct TargetModel {
    pointer: TypeLayoutSpec,
    overrides: BTreeMap<String, TypeLayoutSpec>,
}

const fn spec(size: u64, align: u64) -> TypeLayoutSpec {
    TypeLayoutSpec { size, align }
}

impl TargetModel {
    pub fn new(config: &LayoutConfig) -> Self {
        let overrides = config
            .types
            .iter()
            .map(|(name, layout)| (normalize(name), *layout))
            .collect();
        Self {
            pointer: spec(config.pointer_size, config.pointer_align),
            overrides,
        }
    }

    pub fn pointer(&self) -> TypeLayoutSpec {
        self.pointer
    }

    /// Layout of a builtin type spelled `name`, if it is one.
    pub fn builtin(&self, name: &str) -> Option<TypeLayoutSpec> {
        let name = normalize(name);
        if let Some(layout) = self.overrides.get(&name) {
            return Some(*layout);
        }

        let fixed = match name.as_str() {
            "bool" | "char8_t" | "int8_t" | "uint8_t" => Some(spec(1, 1)),
            "char16_t" | "int16_t" | "uint16_t" => Some(spec(2, 2)),
            "float" | "wchar_t" | "char32_t" | "int32_t" | "uint32_t" => Some(spec(4, 4)),
            "double" | "int64_t" | "uint64_t" => Some(spec(8, 8)),
            "long double" | "__int128" | "unsigned __int128" => Some(spec(16, 16)),
            "size_t" | "ssize_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t" | "nullptr_t" => {
                Some(self.pointer)
            }
            _ => None,
        };
        fixed.or_else(|| integer_layout(&name))
    }
}

/// Collapse whitespace and drop a leading `std::`.
fn normalize(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join(" ");
    joined
        .strip_prefix("std::")
        .map(str::to_string)
        .unwrap_or(joined)
}

/// Layout of any spelling built from `signed`, `unsigned`, `short`, `long`,
/// `int` and `char`, in any order.
fn integer_layout(name: &str) -> Option<TypeLayoutSpec> {
    let words: Vec<&str> = name.split(' ').collect();
    if words.is_empty()
        || !words
            .iter()
            .all(|w| matches!(*w, "signed" | "unsigned" | "short" | "long" | "int" | "char"))
    {
        return None;
    }

    let longs = words.iter().filter(|w| **w == "long").count();
    let layout = if words.contains(&"char") {
        spec(1, 1)
    } else if words.contains(&"short") {
        spec(2, 2)
    } else if longs > 0 {
        spec(8, 8)
    } else {
        spec(4, 4)
    };
    Some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_spellings() {
        let target = TargetModel::new(&LayoutConfig::default());
        assert_eq!(target.builtin("int"), Some(spec(4, 4)));
        assert_eq!(target.builtin("unsigned"), Some(spec(4, 4)));
        assert_eq!(target.builtin("long unsigned int"), Some(spec(8, 8)));
        assert_eq!(target.builtin("unsigned long long"), Some(spec(8, 8)));
        assert_eq!(target.builtin("short  int"), Some(spec(2, 2)));
        assert_eq!(target.builtin("signed char"), Some(spec(1, 1)));
        assert_eq!(target.builtin("long double"), Some(spec(16, 16)));
        assert_eq!(target.builtin("std::uint16_t"), Some(spec(2, 2)));
        assert_eq!(target.builtin("Widget"), None);
        assert_eq!(target.builtin("long Widget"), None);
    }

    #[test]
    fn test_config_overrides_and_pointer_size() {
        let mut config = LayoutConfig {
            pointer_size: 4,
            pointer_align: 4,
            ..LayoutConfig::default()
        };
        config.types.insert("long".into(), spec(4, 4));
        config.types.insert("half".into(), spec(2, 2));

        let target = TargetModel::new(&config);
        assert_eq!(target.builtin("long"), Some(spec(4, 4)));
        assert_eq!(target.builtin("half"), Some(spec(2, 2)));
        assert_eq!(target.builtin("size_t"), Some(spec(4, 4)));
        assert_eq!(target.pointer(), spec(4, 4));
    }
}
