//! Tool visibility/ordering configuration and its normalization over the
//! defaults derived from the catalog.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::catalog;

pub const CONFIG_VERSION: u32 = 1;

/// Category id that tools with an unknown category resolve to.
pub const UNCATEGORIZED_ID: &str = "uncategorized";

/// A config entry field as it appeared in JSON: missing, explicit `null`, or
/// a value. Merging keeps the distinction so that an explicit `null` in a
/// remote entry overwrites a default while a missing key does not.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// `self` if it was present in the source JSON (value or `null`),
    /// otherwise `fallback`.
    pub fn or(self, fallback: Field<T>) -> Field<T> {
        match self {
            Field::Absent => fallback,
            present => present,
        }
    }
}

impl<T: Copy> Field<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

/// Lenient: a value of the wrong type reads as `null`, so one bad field
/// never invalidates the rest of a stored config.
impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only called when the key is present; absence comes from `#[serde(default)]`.
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Field::Null,
            value => T::deserialize(value).map_or(Field::Null, Field::Value),
        })
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub order: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub enabled: Field<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub category_id: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub order: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub enabled: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub featured: Field<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    pub version: u32,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn lenient<'de, D: Deserializer<'de>, T: DeserializeOwned>(deserializer: D) -> Result<Option<T>, D::Error> {
    Ok(T::deserialize(Value::deserialize(deserializer)?).ok())
}

fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient(deserializer)?.unwrap_or(CONFIG_VERSION))
}

/// Entries keyed by a unique id; merging into an existing key keeps its
/// position, new keys are appended.
trait Keyed: Sized {
    fn key(&self) -> &str;
    fn merged_over(self, base: Self) -> Self;
}

impl Keyed for CategoryConfig {
    fn key(&self) -> &str {
        &self.id
    }

    fn merged_over(self, base: Self) -> Self {
        let mut extra = base.extra;
        extra.extend(self.extra);
        CategoryConfig {
            id: self.id,
            order: self.order.or(base.order),
            enabled: self.enabled.or(base.enabled),
            extra,
        }
    }
}

impl Keyed for ToolConfig {
    fn key(&self) -> &str {
        &self.path
    }

    fn merged_over(self, base: Self) -> Self {
        let mut extra = base.extra;
        extra.extend(self.extra);
        ToolConfig {
            path: self.path,
            category_id: self.category_id.or(base.category_id),
            order: self.order.or(base.order),
            enabled: self.enabled.or(base.enabled),
            featured: self.featured.or(base.featured),
            extra,
        }
    }
}

fn merge_entries<T: Keyed + Clone + Default>(defaults: &[T], overrides: Vec<T>) -> Vec<T> {
    let mut merged: Vec<T> = defaults.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.key().to_string(), i))
        .collect();

    for entry in overrides {
        match index.get(entry.key()) {
            Some(&i) => {
                let base = std::mem::take(&mut merged[i]);
                merged[i] = entry.merged_over(base);
            }
            None => {
                index.insert(entry.key().to_string(), merged.len());
                merged.push(entry);
            }
        }
    }

    merged
}

impl ToolsConfig {
    /// Build the default config from the compiled catalog: every category and
    /// tool enabled, ordered by build position, nothing featured.
    pub fn defaults() -> Self {
        let categories = catalog::categories()
            .iter()
            .enumerate()
            .map(|(i, category)| CategoryConfig {
                id: category.name.to_string(),
                order: Field::Value(i as f64),
                enabled: Field::Value(true),
                extra: Map::new(),
            })
            .collect();

        let tools = catalog::categories()
            .iter()
            .flat_map(|category| {
                category.tools.iter().enumerate().map(move |(i, tool)| ToolConfig {
                    path: tool.path.to_string(),
                    category_id: Field::Value(category.name.to_string()),
                    order: Field::Value(i as f64),
                    enabled: Field::Value(true),
                    featured: Field::Value(false),
                    extra: Map::new(),
                })
            })
            .collect();

        ToolsConfig {
            version: CONFIG_VERSION,
            categories,
            tools,
            updated_at: None,
        }
    }

    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn tool(&self, path: &str) -> Option<&ToolConfig> {
        self.tools.iter().find(|t| t.path == path)
    }
}

/// Merge a possibly partial persisted config over the defaults.
///
/// Every default category and tool key is present in the result, overridden
/// field by field by the matching remote entry. Remote-only entries are
/// appended. Category references are not checked here.
pub fn normalize(config: Option<ToolsConfig>, defaults: &ToolsConfig) -> ToolsConfig {
    let Some(config) = config else {
        return defaults.clone();
    };

    ToolsConfig {
        version: CONFIG_VERSION,
        categories: merge_entries(&defaults.categories, config.categories),
        tools: merge_entries(&defaults.tools, config.tools),
        updated_at: config.updated_at,
    }
}
