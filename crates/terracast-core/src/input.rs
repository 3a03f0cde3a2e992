//! Parsed-configuration input types.
//!
//! This is the boundary with the HCL/JSON parser, which is an external
//! collaborator: Terracast consumes its normalized output and never
//! reads Terraform source itself. Attribute values are opaque
//! `serde_json::Value` maps here and only here; [`AttrView`] gives
//! mappers a typed window onto them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque attribute map as produced by the parser.
pub type AttributeMap = BTreeMap<String, serde_json::Value>;

/// References grouped by the attribute whose expression contains them.
pub type ReferenceMap = BTreeMap<String, Vec<String>>;

// =============================================================================
// SOURCE LOCATION
// =============================================================================

/// Position of a block in the configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File path relative to the configuration root.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a source location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

/// An attribute expression as the parser saw it: raw text plus the
/// value when the parser could fully evaluate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Raw expression text, e.g. `length(var.azs)`.
    pub raw: String,
    /// Fully evaluated value, when evaluation succeeded.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl Expression {
    /// An expression with no evaluated value.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw: text.into(),
            value: None,
        }
    }

    /// A fully evaluated expression.
    #[must_use]
    pub fn evaluated(text: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            raw: text.into(),
            value: Some(value),
        }
    }
}

// =============================================================================
// PARSED BLOCKS
// =============================================================================

/// A parsed `resource` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResource {
    /// Terraform address, e.g. `aws_instance.web` or
    /// `module.net.aws_subnet.a`.
    pub address: String,
    /// Resource type, e.g. `aws_instance`.
    pub resource_type: String,
    /// Module path from the root (empty for the root module).
    #[serde(default)]
    pub module_path: Vec<String>,
    /// Provider reference (`aws` or `aws.west`), when explicit.
    #[serde(default)]
    pub provider: Option<String>,
    /// Explicit `depends_on` addresses.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Attribute values.
    #[serde(default)]
    pub attributes: AttributeMap,
    /// Raw reference strings per attribute.
    #[serde(default)]
    pub references: ReferenceMap,
    /// `count` expression, when present.
    #[serde(default)]
    pub count: Option<Expression>,
    /// `for_each` expression, when present.
    #[serde(default)]
    pub for_each: Option<Expression>,
    /// Source position.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A parsed `data` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDataSource {
    /// Terraform address, e.g. `data.aws_ami.ubuntu`.
    pub address: String,
    /// Data source type, e.g. `aws_ami`.
    pub data_type: String,
    /// Module path from the root.
    #[serde(default)]
    pub module_path: Vec<String>,
    /// Explicit `depends_on` addresses.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Attribute values.
    #[serde(default)]
    pub attributes: AttributeMap,
    /// Raw reference strings per attribute.
    #[serde(default)]
    pub references: ReferenceMap,
    /// Source position.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A parsed `module` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedModule {
    /// Terraform address, e.g. `module.network`.
    pub address: String,
    /// Module source string.
    #[serde(default)]
    pub source: String,
    /// Module path of the *calling* module.
    #[serde(default)]
    pub module_path: Vec<String>,
    /// Input attribute values.
    #[serde(default)]
    pub inputs: AttributeMap,
    /// Raw reference strings per input attribute.
    #[serde(default)]
    pub references: ReferenceMap,
    /// Names of the module's declared outputs.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// `count` expression, when present.
    #[serde(default)]
    pub count: Option<Expression>,
    /// `for_each` expression, when present.
    #[serde(default)]
    pub for_each: Option<Expression>,
    /// Source position.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A parsed `provider` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedProvider {
    /// Provider type, e.g. `aws`.
    pub provider_type: String,
    /// Alias, when declared.
    #[serde(default)]
    pub alias: Option<String>,
    /// Region from the block, when declared.
    #[serde(default)]
    pub region: Option<String>,
    /// Remaining provider configuration.
    #[serde(default)]
    pub config: AttributeMap,
    /// Source position.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A parsed `variable`, `locals` entry, or `output`; only the
/// address matters for graph edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedValue {
    /// Address, e.g. `var.region`, `local.tags`, `output.vpc_id`.
    pub address: String,
    /// Module path from the root.
    #[serde(default)]
    pub module_path: Vec<String>,
    /// Raw reference strings in the value expression.
    #[serde(default)]
    pub references: Vec<String>,
    /// Source position.
    #[serde(default)]
    pub location: SourceLocation,
}

/// The parser's complete normalized output for one configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedConfig {
    /// `resource` blocks.
    #[serde(default)]
    pub resources: Vec<ParsedResource>,
    /// `data` blocks.
    #[serde(default)]
    pub data_sources: Vec<ParsedDataSource>,
    /// `module` blocks.
    #[serde(default)]
    pub modules: Vec<ParsedModule>,
    /// `provider` blocks.
    #[serde(default)]
    pub providers: Vec<ParsedProvider>,
    /// `variable` blocks.
    #[serde(default)]
    pub variables: Vec<ParsedValue>,
    /// `locals` entries.
    #[serde(default)]
    pub locals: Vec<ParsedValue>,
    /// `output` blocks.
    #[serde(default)]
    pub outputs: Vec<ParsedValue>,
}

// =============================================================================
// TYPED ATTRIBUTE VIEW
// =============================================================================

/// Typed window onto an opaque attribute map.
///
/// Mappers read attributes through this view so the `serde_json::Value`
/// representation stays confined to the parser boundary.
#[derive(Debug, Clone, Copy)]
pub struct AttrView<'a> {
    attributes: &'a AttributeMap,
}

impl<'a> AttrView<'a> {
    /// Wraps an attribute map.
    #[must_use]
    pub fn new(attributes: &'a AttributeMap) -> Self {
        Self { attributes }
    }

    /// String attribute, if present and a string.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Integer attribute; accepts JSON numbers and numeric strings.
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Decimal attribute; accepts JSON numbers and numeric strings.
    #[must_use]
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        match self.attributes.get(key)? {
            serde_json::Value::Number(n) => n.to_string().parse().ok(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Boolean attribute.
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(|v| v.as_bool())
    }

    /// True when the attribute is present at all.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn attrs() -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("instance_type".into(), json!("t3.micro"));
        map.insert("volume_size".into(), json!(20));
        map.insert("iops".into(), json!("3000"));
        map.insert("encrypted".into(), json!(true));
        map.insert("size_gb".into(), json!(8.5));
        map
    }

    #[test]
    fn view_reads_typed_values() {
        let map = attrs();
        let view = AttrView::new(&map);
        assert_eq!(view.str("instance_type"), Some("t3.micro"));
        assert_eq!(view.int("volume_size"), Some(20));
        assert_eq!(view.int("iops"), Some(3000));
        assert_eq!(view.bool("encrypted"), Some(true));
        assert_eq!(view.decimal("size_gb"), Some(dec!(8.5)));
        assert!(view.str("missing").is_none());
    }

    #[test]
    fn parsed_config_deserializes_sparsely() {
        let config: ParsedConfig = serde_json::from_value(json!({
            "resources": [{
                "address": "aws_instance.web",
                "resource_type": "aws_instance",
                "attributes": {"instance_type": "t3.micro"},
                "count": {"raw": "2", "value": 2}
            }]
        }))
        .unwrap();
        assert_eq!(config.resources.len(), 1);
        assert_eq!(config.resources[0].count.as_ref().unwrap().raw, "2");
        assert!(config.modules.is_empty());
    }
}
