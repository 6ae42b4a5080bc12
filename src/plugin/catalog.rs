//! Static catalog of installable plugins.
//!
//! The catalog is the only source of installation data. Installing an id
//! copies its catalog descriptor into the registry; an entry marked
//! `enabled` is enabled on install.

use once_cell::sync::Lazy;

use super::{PluginCategory, PluginDescriptor, PluginError, PluginResult};
use crate::settings::Schema;

static CATALOG: Lazy<Vec<PluginDescriptor>> = Lazy::new(build_catalog);

fn entry(
    id: &str,
    name: &str,
    icon: &str,
    category: PluginCategory,
    description: &str,
) -> PluginDescriptor {
    let mut plugin = PluginDescriptor::new(id, name);
    plugin.author = "slotdeck".to_string();
    plugin.version = crate::VERSION.to_string();
    plugin.icon = icon.to_string();
    plugin.category = category;
    plugin.description = description.to_string();
    plugin
}

fn build_catalog() -> Vec<PluginDescriptor> {
    let mut clock = entry("clock", "Clock", "🕒", PluginCategory::Widget, "Shows the local time")
        .with_schema(
            Schema::object()
                .with("format24h", Schema::boolean("24-hour format", true))
                .with("showSeconds", Schema::boolean("Show seconds", false))
                .with("label", Schema::string("Label", "Local time")),
        )
        .with_slots(["dashboard", "default"]);
    clock.enabled = true;

    let mut goals = entry(
        "daily-goals",
        "Daily Goals",
        "🎯",
        PluginCategory::Health,
        "Step and water targets for the day",
    )
    .with_schema(
        Schema::object()
            .with(
                "dailyGoals",
                Schema::object()
                    .titled("Daily goals")
                    .with("steps", Schema::number("Steps", 10_000).bounded(Some(0.0), None))
                    .with("water", Schema::number("Glasses of water", 8).bounded(Some(0.0), Some(30.0))),
            )
            .with("units", Schema::choice("Units", "metric", ["metric", "imperial"])),
    )
    .with_slots(["dashboard"]);
    goals.permissions = vec!["storage".to_string()];

    let notes = entry(
        "quick-notes",
        "Quick Notes",
        "📝",
        PluginCategory::Productivity,
        "A scratch note pinned to the sidebar",
    )
    .with_schema(
        Schema::object()
            .with("title", Schema::string("Title", "Notes"))
            .with("note", Schema::string("Note", "").multiline()),
    )
    .with_slots(["sidebar"]);

    let pomodoro = entry(
        "pomodoro",
        "Pomodoro",
        "🍅",
        PluginCategory::Productivity,
        "Focus and break timer settings",
    )
    .with_schema(
        Schema::object()
            .with("focusMinutes", Schema::number("Focus minutes", 25).bounded(Some(1.0), Some(120.0)))
            .with("breakMinutes", Schema::number("Break minutes", 5).bounded(Some(1.0), Some(60.0))),
    )
    .with_slots(["dashboard", "sidebar"]);

    let mut greeting =
        entry("greeting", "Greeting", "👋", PluginCategory::Other, "Says hello").with_schema(
            Schema::object()
                .with("name", Schema::string("Name", "friend"))
                .with("excited", Schema::boolean("Exclamation mark", false)),
        );
    greeting.enabled = true;

    // Listed for discovery; no implementation ships with this build.
    let ticker = entry(
        "market-ticker",
        "Market Ticker",
        "📈",
        PluginCategory::Widget,
        "Live prices for a watchlist",
    )
    .with_schema(
        Schema::object().with("symbols", Schema::string("Symbols", "AAPL,MSFT")),
    )
    .with_slots(["dashboard"]);

    vec![clock, goals, notes, pomodoro, greeting, ticker]
}

/// Every catalog entry, in display order.
pub fn catalog() -> &'static [PluginDescriptor] {
    &CATALOG
}

/// Find a catalog entry by exact id.
pub fn find(id: &str) -> Option<&'static PluginDescriptor> {
    CATALOG.iter().find(|p| p.id == id)
}

/// Catalog entry for `id`, or [`PluginError::NotInCatalog`].
pub fn lookup(id: &str) -> PluginResult<&'static PluginDescriptor> {
    find(id).ok_or_else(|| PluginError::NotInCatalog(id.to_string()))
}

/// Case-insensitive search over id, name and description.
pub fn search(query: &str) -> Vec<&'static PluginDescriptor> {
    let query_lower = query.to_lowercase();

    CATALOG
        .iter()
        .filter(|p| {
            p.id.to_lowercase().contains(&query_lower)
                || p.name.to_lowercase().contains(&query_lower)
                || p.description.to_lowercase().contains(&query_lower)
        })
        .collect()
}

/// Catalog entries in `category`.
pub fn by_category(category: PluginCategory) -> Vec<&'static PluginDescriptor> {
    CATALOG.iter().filter(|p| p.category == category).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::plugin::LoaderTable;
    use crate::settings::SettingsSchemaEngine;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<_> = catalog().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), catalog().len());
    }

    #[test]
    fn test_catalog_entries_are_not_installed() {
        assert!(catalog().iter().all(|p| !p.installed));
    }

    #[test]
    fn test_schemas_are_walkable() {
        for plugin in catalog() {
            let schema = plugin.settings_schema.as_ref().unwrap();
            let fields = SettingsSchemaEngine::walk(schema, "").unwrap();
            assert!(!fields.is_empty(), "{} has no fields", plugin.id);
        }
    }

    #[test]
    fn test_daily_goals_nested_keys() {
        let schema = find("daily-goals").unwrap().settings_schema.as_ref().unwrap();
        let keys: Vec<_> =
            SettingsSchemaEngine::walk(schema, "").unwrap().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["dailyGoals.steps", "dailyGoals.water", "units"]);
    }

    #[test]
    fn test_builtin_table_covers_catalog_except_ticker() {
        let table = LoaderTable::builtin();
        for plugin in catalog() {
            assert_eq!(table.contains(&plugin.id), plugin.id != "market-ticker", "{}", plugin.id);
        }
    }

    #[test]
    fn test_lookup_and_search() {
        assert_eq!(lookup("clock").unwrap().name, "Clock");
        assert!(matches!(lookup("nope"), Err(PluginError::NotInCatalog(_))));

        let hits: Vec<_> = search("FOCUS").into_iter().map(|p| p.id.as_str()).collect();
        assert_eq!(hits, vec!["pomodoro"]);
        assert_eq!(by_category(PluginCategory::Productivity).len(), 2);
    }
}
