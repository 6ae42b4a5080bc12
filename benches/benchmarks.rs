//! Performance benchmarks for Slotdeck.
//!
//! This module contains benchmarks for:
//! - Registry transitions and slot filtering with large plugin sets
//! - Settings schema walks and effective settings resolution
//! - Store encoding and decoding
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};
use slotdeck::plugin::{decode, encode, PluginDescriptor, PluginRegistry, RegistryAction, RegistryState};
use slotdeck::settings::{Schema, SettingsSchemaEngine};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    const SLOTS: [&str; 4] = ["dashboard", "sidebar", "footer", "default"];

    /// A schema with `groups` nested objects of `leaves` fields each.
    pub fn schema(groups: usize, leaves: usize) -> Schema {
        let mut root = Schema::object();
        for g in 0..groups {
            let mut group = Schema::object().titled(format!("Group {g}"));
            for l in 0..leaves {
                let leaf = match l % 3 {
                    0 => Schema::boolean(format!("Flag {l}"), l % 2 == 0),
                    1 => Schema::number(format!("Count {l}"), l as i64).bounded(Some(0.0), Some(1000.0)),
                    _ => Schema::choice(format!("Mode {l}"), "a", ["a", "b", "c"]),
                };
                group = group.with(format!("field{l}"), leaf);
            }
            root = root.with(format!("group{g}"), group);
        }
        root
    }

    /// Stored overrides for half the fields of [`schema`], some with wrong types.
    pub fn overrides(groups: usize, leaves: usize) -> Map<String, Value> {
        let mut map = Map::new();
        for g in 0..groups {
            for l in (0..leaves).step_by(2) {
                let value = if l % 4 == 0 { json!("wrong type") } else { json!(l) };
                map.insert(format!("group{g}.field{l}"), value);
            }
        }
        map
    }

    /// Installed plugins spread over the known slots, two thirds enabled.
    pub fn plugins(count: usize) -> Vec<PluginDescriptor> {
        (0..count)
            .map(|i| {
                let mut plugin = PluginDescriptor::new(format!("plugin-{i}"), format!("Plugin {i}"))
                    .with_slots([SLOTS[i % SLOTS.len()]])
                    .with_schema(schema(2, 4));
                plugin.installed = true;
                plugin.enabled = i % 3 != 0;
                plugin
            })
            .collect()
    }
}

// ============================================================================
// Registry Benchmarks
// ============================================================================

fn bench_slot_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/plugins_for_slot");

    for count in [10, 100, 1000].iter() {
        let registry = PluginRegistry::in_memory();
        for plugin in fixtures::plugins(*count) {
            registry.install(plugin);
        }

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| registry.plugins_for_slot(black_box("dashboard")));
        });
    }

    group.finish();
}

fn bench_transitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/transitions");
    let plugins = fixtures::plugins(200);

    group.bench_function("install_200", |b| {
        b.iter(|| {
            let mut state = RegistryState::default();
            for plugin in &plugins {
                state.apply(black_box(RegistryAction::Install(plugin.clone())));
            }
            state
        });
    });

    group.bench_function("toggle_200", |b| {
        let mut state = RegistryState::default();
        for plugin in &plugins {
            state.apply(RegistryAction::Install(plugin.clone()));
        }
        b.iter(|| {
            for plugin in &plugins {
                state.apply(RegistryAction::Disable(plugin.id.clone()));
                state.apply(RegistryAction::Enable(plugin.id.clone()));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Settings Benchmarks
// ============================================================================

fn bench_schema_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("settings/walk");

    for (groups, leaves) in [(1, 5), (5, 10), (20, 20)].iter() {
        let schema = fixtures::schema(*groups, *leaves);
        group.throughput(Throughput::Elements((groups * leaves) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{groups}x{leaves}")),
            &schema,
            |b, schema| b.iter(|| SettingsSchemaEngine::walk(black_box(schema), "")),
        );
    }

    group.finish();
}

fn bench_effective_settings(c: &mut Criterion) {
    let schema = fixtures::schema(10, 10);
    let stored = fixtures::overrides(10, 10);

    c.bench_function("settings/effective_settings_100", |b| {
        b.iter(|| SettingsSchemaEngine::effective_settings(Some(black_box(&schema)), black_box(&stored)));
    });
}

// ============================================================================
// Store Benchmarks
// ============================================================================

fn bench_store_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let plugins = fixtures::plugins(100);
    let encoded = encode(&plugins).unwrap_or_default();

    group.bench_function("encode_100", |b| b.iter(|| encode(black_box(&plugins))));
    group.bench_function("decode_100", |b| b.iter(|| decode(black_box(&encoded))));

    group.finish();
}

criterion_group!(
    benches,
    bench_slot_filtering,
    bench_transitions,
    bench_schema_walk,
    bench_effective_settings,
    bench_store_codec
);
criterion_main!(benches);
