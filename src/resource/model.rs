//! Resource Model
//!
//! One sentry instance, either a desired plan or stored state. Serialized as
//! a flat record keyed by attribute name; `config` and `tags` are the only
//! nested values.

use super::diagnostics::{Diagnostic, DiagnosticClass, Diagnostics};
use super::schema::{
    AttributeType, ResourceSchema, ATTR_CONFIG, ATTR_DESCRIPTION, ATTR_ENABLED, ATTR_ID,
    ATTR_LAST_UPDATED, ATTR_NAME, ATTR_SECTOR, ATTR_STATUS, ATTR_TAGS,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Status assigned on create
pub const STATUS_ACTIVE: &str = "active";

/// A single sentry instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInstance {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// `None` in a plan means "use the default"
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl ResourceInstance {
    /// A plan with only a name set
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// An instance known only by ID, as used by import
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Effective `enabled`, falling back to `default`
    pub fn enabled_or(&self, default: bool) -> bool {
        self.enabled.unwrap_or(default)
    }

    /// Whether the attribute has no usable value
    pub fn is_blank(&self, attribute: &str) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }

        match attribute {
            ATTR_ID => blank(&self.id),
            ATTR_NAME => self.name.trim().is_empty(),
            ATTR_DESCRIPTION => blank(&self.description),
            ATTR_SECTOR => blank(&self.sector),
            ATTR_STATUS => blank(&self.status),
            ATTR_ENABLED => self.enabled.is_none(),
            ATTR_CONFIG => self.config.is_empty(),
            ATTR_TAGS => self.tags.is_empty(),
            ATTR_LAST_UPDATED => blank(&self.last_updated),
            _ => true,
        }
    }

    /// Copy one attribute's value from `other`
    pub fn copy_attribute(&mut self, attribute: &str, other: &ResourceInstance) {
        match attribute {
            ATTR_ID => self.id = other.id.clone(),
            ATTR_NAME => self.name = other.name.clone(),
            ATTR_DESCRIPTION => self.description = other.description.clone(),
            ATTR_SECTOR => self.sector = other.sector.clone(),
            ATTR_STATUS => self.status = other.status.clone(),
            ATTR_ENABLED => self.enabled = other.enabled,
            ATTR_CONFIG => self.config = other.config.clone(),
            ATTR_TAGS => self.tags = other.tags.clone(),
            ATTR_LAST_UPDATED => self.last_updated = other.last_updated.clone(),
            _ => {}
        }
    }

    /// Replace the caller-owned fields with those of `desired`
    pub fn apply_mutable(&mut self, desired: &ResourceInstance) {
        self.name = desired.name.clone();
        self.description = desired.description.clone();
        self.enabled = desired.enabled;
        self.config = desired.config.clone();
        self.tags = desired.tags.clone();
    }

    /// Flat record with every attribute present; absent values are `null`
    pub fn to_record(&self) -> Value {
        // Struct fields are all plain strings/bools/maps, serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a flat record, reporting every attribute that does not match the
    /// schema. Returns `None` if any error was reported.
    pub fn from_record(
        record: &Value,
        schema: &ResourceSchema,
    ) -> (Option<ResourceInstance>, Diagnostics) {
        let mut diags = Diagnostics::new();

        let Some(obj) = record.as_object() else {
            diags.add_error(
                DiagnosticClass::Validation,
                "Invalid resource record",
                "Expected an object keyed by attribute name.",
            );
            return (None, diags);
        };

        for key in obj.keys() {
            if schema.attribute(key).is_none() {
                diags.push(
                    Diagnostic::error(
                        DiagnosticClass::Validation,
                        "Unsupported attribute",
                        format!(
                            "An attribute named \"{}\" is not expected here. Expected one of: {}.",
                            key,
                            schema.attribute_names().collect::<Vec<_>>().join(", ")
                        ),
                    )
                    .at(key),
                );
            }
        }

        let mut instance = ResourceInstance::default();

        for spec in &schema.attributes {
            let value = match obj.get(spec.name) {
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };

            let ok = match spec.attr_type {
                AttributeType::String => match value.as_str() {
                    Some(s) => {
                        instance.set_string(spec.name, s);
                        true
                    }
                    None => false,
                },
                AttributeType::Bool => match value.as_bool() {
                    Some(b) => {
                        instance.enabled = Some(b);
                        true
                    }
                    None => false,
                },
                AttributeType::StringMap => match value.as_object().and_then(decode_string_map) {
                    Some(map) => {
                        if spec.name == ATTR_CONFIG {
                            instance.config = map;
                        } else {
                            instance.tags = map;
                        }
                        true
                    }
                    None => false,
                },
            };

            if !ok {
                diags.push(
                    Diagnostic::error(
                        DiagnosticClass::Validation,
                        "Incorrect attribute value type",
                        format!(
                            "Attribute \"{}\" must be a {}.",
                            spec.name,
                            spec.attr_type.as_str()
                        ),
                    )
                    .at(spec.name),
                );
            }
        }

        if diags.has_error() {
            (None, diags)
        } else {
            (Some(instance), diags)
        }
    }

    fn set_string(&mut self, attribute: &str, value: &str) {
        let value = value.to_string();
        match attribute {
            ATTR_ID => self.id = Some(value),
            ATTR_NAME => self.name = value,
            ATTR_DESCRIPTION => self.description = Some(value),
            ATTR_SECTOR => self.sector = Some(value),
            ATTR_STATUS => self.status = Some(value),
            ATTR_LAST_UPDATED => self.last_updated = Some(value),
            _ => {}
        }
    }
}

/// `null` reads the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn decode_string_map(obj: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    obj.iter()
        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}
