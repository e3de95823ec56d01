//! Generator configuration.
//!
//! The CLI fills this record; the pipeline and emitter consume it.

use std::path::PathBuf;

/// One `-i` include: a file name plus whether it was given in angle
/// brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeFile {
    pub name: String,
    pub system: bool,
}

/// Everything the generator can be told from the outside.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Grammar file to read.
    pub input: PathBuf,
    /// Base name of the two output files; `syngen` when absent.
    pub output_base: Option<PathBuf>,
    /// Files to include into the generated code, in order.
    pub include_files: Vec<IncludeFile>,
    /// Member name pattern for attributes, `prefix^suffix` form.
    pub attr_name_pattern: Option<String>,
    /// Namespace of user-supplied definitions.
    pub namespace: Option<String>,
    /// Namespace of user classes (overrides `namespace`).
    pub namespace_classes: Option<String>,
    /// Namespace of user primitive types (overrides `namespace`).
    pub namespace_types: Option<String>,
    /// Namespace of native expressions (overrides `namespace`).
    pub namespace_native: Option<String>,
    /// Namespace of the generated code itself.
    pub namespace_code: Option<String>,
    /// Assign attributes through setter functions instead of members.
    pub use_attr_setters: bool,
    /// Allocator type used by generated object creation.
    pub allocator: Option<String>,
    pub verbose: bool,
}

impl GeneratorConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        GeneratorConfig {
            input: input.into(),
            ..GeneratorConfig::default()
        }
    }

    pub fn classes_namespace(&self) -> Option<&str> {
        self.namespace_classes.as_deref().or(self.namespace.as_deref())
    }

    pub fn types_namespace(&self) -> Option<&str> {
        self.namespace_types.as_deref().or(self.namespace.as_deref())
    }

    pub fn native_namespace(&self) -> Option<&str> {
        self.namespace_native.as_deref().or(self.namespace.as_deref())
    }

    /// Applies the attribute name pattern: `m_^` turns `value` into
    /// `m_value`.
    pub fn attr_member_name(&self, attr: &str) -> String {
        match &self.attr_name_pattern {
            Some(pattern) => pattern.replace('^', attr),
            None => attr.to_string(),
        }
    }

    /// Output base; the two files are `<base>.h` and `<base>.cpp`.
    pub fn output_base_path(&self) -> PathBuf {
        self.output_base
            .clone()
            .unwrap_or_else(|| PathBuf::from("syngen"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_pattern_replaces_the_caret() {
        let mut config = GeneratorConfig::new("g.syn");
        config.attr_name_pattern = Some("m_^_".to_string());
        assert_eq!(config.attr_member_name("kind"), "m_kind_");
    }

    #[test]
    fn specific_namespaces_override_the_default() {
        let mut config = GeneratorConfig::new("g.syn");
        config.namespace = Some("ast".to_string());
        assert_eq!(config.classes_namespace(), Some("ast"));
        config.namespace_classes = Some("ast_nodes".to_string());
        assert_eq!(config.classes_namespace(), Some("ast_nodes"));
        assert_eq!(config.types_namespace(), Some("ast"));
    }

    #[test]
    fn output_base_defaults_to_syngen() {
        let config = GeneratorConfig::new("g.syn");
        assert_eq!(config.output_base_path(), PathBuf::from("syngen"));
    }
}
