use crate::constants::{GUI_TYPES, WRAPPER_TYPES};

/// Every `"type"` tag a resolved schema item may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Boolean,
    Number,
    Text,
    Enum,
    PathInput,
    RawJson,
    /// `path` / `path-widget`: expands into a path input, a list of them or
    /// a per-platform dict.
    Path,
    Dict,
    DictModifiable,
    List,
    ListStrict,
    /// Layout-only container whose children join the parent namespace.
    Wrapper,
    /// Label, separator and friends; no value.
    Gui,
}

impl SchemaType {
    pub fn parse(tag: &str) -> Option<Self> {
        let kind = match tag {
            "boolean" => SchemaType::Boolean,
            "number" => SchemaType::Number,
            "text" => SchemaType::Text,
            "enum" => SchemaType::Enum,
            "path-input" => SchemaType::PathInput,
            "raw-json" => SchemaType::RawJson,
            "path" | "path-widget" => SchemaType::Path,
            "dict" => SchemaType::Dict,
            "dict-modifiable" => SchemaType::DictModifiable,
            "list" => SchemaType::List,
            "list-strict" => SchemaType::ListStrict,
            tag if WRAPPER_TYPES.contains(&tag) => SchemaType::Wrapper,
            tag if GUI_TYPES.contains(&tag) => SchemaType::Gui,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether an item of this type holds a value and therefore needs a key.
    pub fn is_value_type(self) -> bool {
        !matches!(self, SchemaType::Wrapper | SchemaType::Gui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(SchemaType::parse("dict-modifiable"), Some(SchemaType::DictModifiable));
        assert_eq!(SchemaType::parse("path-widget"), Some(SchemaType::Path));
        assert_eq!(SchemaType::parse("collapsible-wrap"), Some(SchemaType::Wrapper));
        assert_eq!(SchemaType::parse("splitter"), Some(SchemaType::Gui));
        assert_eq!(SchemaType::parse("anatomy-templates-enum"), None);
    }

    #[test]
    fn test_value_types() {
        assert!(SchemaType::Text.is_value_type());
        assert!(!SchemaType::Wrapper.is_value_type());
        assert!(!SchemaType::Gui.is_value_type());
    }
}
