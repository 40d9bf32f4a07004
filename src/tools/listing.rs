//! Resolve a normalized config against the catalog into the grouped, ordered
//! listing of visible tools.

use serde::Serialize;
use std::collections::HashMap;

use super::{
    catalog::{self, CatalogTool},
    config::{CategoryConfig, Field, ToolsConfig, UNCATEGORIZED_ID},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleTool {
    pub path: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub keywords: &'static [&'static str],
    pub category_id: String,
    pub order: f64,
    pub featured: bool,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub name: String,
    pub tools: Vec<VisibleTool>,
}

/// Group the enabled catalog tools by resolved category.
///
/// A tool is shown unless its own `enabled` or its category's `enabled` is
/// explicitly `false`. Tools whose category is unknown to `config` land in
/// the `uncategorized` group. Groups are ordered by the config's category
/// order, then the build-time order; tools by their own order. Both sorts are
/// stable, so ties keep catalog order.
pub fn resolve(config: &ToolsConfig, defaults: &ToolsConfig) -> Vec<CategoryGroup> {
    let uncategorized = CategoryConfig {
        id: UNCATEGORIZED_ID.to_string(),
        order: Field::Value(f64::INFINITY),
        enabled: Field::Value(true),
        ..Default::default()
    };
    let mut categories: HashMap<&str, &CategoryConfig> =
        config.categories.iter().map(|c| (c.id.as_str(), c)).collect();
    categories.entry(UNCATEGORIZED_ID).or_insert(&uncategorized);

    let tool_configs: HashMap<&str, _> = config.tools.iter().map(|t| (t.path.as_str(), t)).collect();

    let default_category_order: HashMap<&str, f64> = defaults
        .categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i as f64))
        .collect();
    let default_tool_order: HashMap<&str, f64> = defaults
        .tools
        .iter()
        .filter_map(|t| t.order.get().map(|order| (t.path.as_str(), order)))
        .collect();

    let mut groups: Vec<(String, Vec<VisibleTool>)> = Vec::new();

    for CatalogTool { category, tool } in catalog::tools() {
        let tool_config = tool_configs.get(tool.path);
        let category_id = tool_config
            .and_then(|t| t.category_id.value())
            .map(String::as_str)
            .unwrap_or(category);
        let resolved_id = if categories.contains_key(category_id) {
            category_id
        } else {
            UNCATEGORIZED_ID
        };
        let category_config = categories.get(resolved_id);

        let enabled = tool_config.and_then(|t| t.enabled.get()).unwrap_or(true)
            && category_config.and_then(|c| c.enabled.get()).unwrap_or(true);
        if !enabled {
            continue;
        }

        let visible = VisibleTool {
            path: tool.path,
            name: tool.name,
            description: tool.description,
            icon: tool.icon,
            keywords: tool.keywords,
            category_id: resolved_id.to_string(),
            order: tool_config
                .and_then(|t| t.order.get())
                .or_else(|| default_tool_order.get(tool.path).copied())
                .unwrap_or(0.0),
            featured: tool_config.and_then(|t| t.featured.get()).unwrap_or(false),
            is_new: tool.is_new,
        };

        match groups.iter_mut().find(|(id, _)| id == resolved_id) {
            Some((_, tools)) => tools.push(visible),
            None => groups.push((resolved_id.to_string(), vec![visible])),
        }
    }

    let group_order = |id: &str| {
        categories
            .get(id)
            .and_then(|c| c.order.get())
            .or_else(|| default_category_order.get(id).copied())
            .unwrap_or(0.0)
    };

    groups.sort_by(|(a, _), (b, _)| group_order(a).total_cmp(&group_order(b)));

    groups
        .into_iter()
        .map(|(name, mut tools)| {
            tools.sort_by(|a, b| a.order.total_cmp(&b.order));
            CategoryGroup { name, tools }
        })
        .collect()
}

/// Whether a tool route should be served. Unknown tools and unknown
/// categories count as enabled.
pub fn is_tool_enabled(config: &ToolsConfig, path: &str) -> bool {
    let tool_config = config.tool(path);
    let category_id = tool_config
        .and_then(|t| t.category_id.value().cloned())
        .or_else(|| catalog::find(path).map(|t| t.category.to_string()));
    let category_config = category_id.as_deref().and_then(|id| config.category(id));

    tool_config.and_then(|t| t.enabled.get()).unwrap_or(true)
        && category_config.and_then(|c| c.enabled.get()).unwrap_or(true)
}
