//! Schema Definition
//!
//! Every sentry kind shares one attribute set. Kinds only differ in the sector
//! label and description text embedded in the schema.

use super::diagnostics::{Diagnostic, DiagnosticClass, Diagnostics};
use super::model::ResourceInstance;
use serde::Serialize;

pub const ATTR_ID: &str = "id";
pub const ATTR_NAME: &str = "name";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_SECTOR: &str = "sector";
pub const ATTR_STATUS: &str = "status";
pub const ATTR_ENABLED: &str = "enabled";
pub const ATTR_CONFIG: &str = "config";
pub const ATTR_TAGS: &str = "tags";
pub const ATTR_LAST_UPDATED: &str = "last_updated";

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    StringMap,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::StringMap => "map of string",
        }
    }
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// Caller must supply it
    Required,
    /// Caller may supply it
    Optional,
    /// Provider assigns it; caller values are ignored
    Computed,
    /// Caller may supply it, otherwise the provider default applies
    OptionalComputed,
}

/// Default applied when an optional+computed attribute is omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
}

/// Specification of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub mutability: Mutability,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Absent values in a plan take the stored value instead
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub use_state_for_unknown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl AttributeSpec {
    pub(crate) fn new(
        name: &'static str,
        description: &'static str,
        attr_type: AttributeType,
        mutability: Mutability,
    ) -> Self {
        Self {
            name,
            description,
            attr_type,
            mutability,
            sensitive: false,
            use_state_for_unknown: false,
            default: None,
        }
    }

    pub(crate) fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    fn keep_state(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_computed(&self) -> bool {
        self.mutability == Mutability::Computed
    }
}

/// Ordered attribute set for one resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSchema {
    pub sector: String,
    pub description: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Build the schema shared by all sentries
pub fn build_schema(sector: &str, description: &str) -> ResourceSchema {
    use AttributeType as T;
    use Mutability as M;

    let attributes = vec![
        AttributeSpec::new(
            ATTR_ID,
            "The unique identifier for this sentry resource.",
            T::String,
            M::Computed,
        )
        .keep_state(),
        AttributeSpec::new(ATTR_NAME, "The name of the sentry instance.", T::String, M::Required),
        AttributeSpec::new(
            ATTR_DESCRIPTION,
            "A description of the sentry instance and its purpose.",
            T::String,
            M::Optional,
        ),
        AttributeSpec::new(
            ATTR_SECTOR,
            "The critical infrastructure sector this sentry protects.",
            T::String,
            M::Computed,
        )
        .keep_state(),
        AttributeSpec::new(
            ATTR_STATUS,
            "The current operational status of the sentry (e.g., active, inactive, maintenance).",
            T::String,
            M::Computed,
        ),
        AttributeSpec::new(
            ATTR_ENABLED,
            "Whether the sentry is enabled and actively monitoring.",
            T::Bool,
            M::OptionalComputed,
        )
        .with_default(DefaultValue::Bool(true)),
        AttributeSpec::new(
            ATTR_CONFIG,
            "Configuration parameters specific to this sentry.",
            T::StringMap,
            M::Optional,
        ),
        AttributeSpec::new(
            ATTR_TAGS,
            "A map of tags to assign to the sentry resource.",
            T::StringMap,
            M::Optional,
        ),
        AttributeSpec::new(
            ATTR_LAST_UPDATED,
            "Timestamp of the last update to this resource.",
            T::String,
            M::Computed,
        ),
    ];

    ResourceSchema {
        sector: sector.to_string(),
        description: description.to_string(),
        attributes,
    }
}

impl ResourceSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.iter().map(|a| a.name)
    }

    /// Default for `enabled` when a plan omits it
    pub fn enabled_default(&self) -> bool {
        match self.attribute(ATTR_ENABLED).and_then(|a| a.default.as_ref()) {
            Some(DefaultValue::Bool(b)) => *b,
            None => true,
        }
    }

    /// Check caller-supplied values. Every violation is reported.
    pub fn validate(&self, instance: &ResourceInstance) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for spec in &self.attributes {
            if spec.mutability == Mutability::Required && instance.is_blank(spec.name) {
                diags.push(
                    Diagnostic::error(
                        DiagnosticClass::Validation,
                        "Missing required attribute",
                        format!(
                            "The attribute \"{}\" is required and must not be empty.",
                            spec.name
                        ),
                    )
                    .at(spec.name),
                );
            }
        }

        for (attr, map) in [(ATTR_CONFIG, &instance.config), (ATTR_TAGS, &instance.tags)] {
            if map.keys().any(|k| k.trim().is_empty()) {
                diags.push(
                    Diagnostic::error(
                        DiagnosticClass::Validation,
                        "Invalid map key",
                        format!("The attribute \"{}\" contains an empty key.", attr),
                    )
                    .at(attr),
                );
            }
        }

        diags
    }
}
