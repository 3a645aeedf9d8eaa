// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for nested config discovery.
//!
//! These tests verify:
//! 1. Every `*Config` record reachable through plain fields gets one provider
//! 2. Providers chain by name and resolve to the live sub-values
//! 3. Pointer fields are followed under the enclosing name and end the walk
//!    of their record, whatever the pointee is called
//! 4. Extractors re-check the shape of their input
//!
//! Run with:
//! ```bash
//! cargo test -p stagehand --test discovery_test
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use stagehand::ConfigTree;
use stagehand::config::discovery::{ConfigProvider, discover, discover_tree};
use stagehand::config::{ConfigHandle, FieldNode, NAMED_CONFIG_POINTER_OUT};

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct RootConfig {
    name: String,
    http: HttpConfig,
    sub: Sub,
    database: DatabaseConfig,
    metrics: MetricsCONFIG,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct HttpConfig {
    port: u16,
    tls: TlsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct TlsConfig {
    cert: String,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct DatabaseConfig {
    url: String,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
#[allow(non_camel_case_types)]
struct MetricsCONFIG {
    enabled: bool,
}

/// Not a config record: neither it nor anything inside it is discovered.
#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct Sub {
    inner: InnerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct InnerConfig {
    level: u8,
}

fn root() -> RootConfig {
    RootConfig {
        name: "svc".into(),
        http: HttpConfig {
            port: 8080,
            tls: TlsConfig {
                cert: "cert.pem".into(),
            },
        },
        sub: Sub {
            inner: InnerConfig { level: 3 },
        },
        database: DatabaseConfig {
            url: "postgres://localhost/db".into(),
        },
        metrics: MetricsCONFIG { enabled: true },
    }
}

/// Runs providers in order the way a graph would, keyed by name.
fn resolve(
    root: ConfigHandle,
    root_name: &str,
    providers: &[ConfigProvider],
) -> HashMap<String, Option<ConfigHandle>> {
    let mut values = HashMap::new();
    values.insert(root_name.to_string(), Some(root));
    for provider in providers {
        let input = values.get(&provider.input).cloned().flatten();
        values.insert(provider.output.clone(), provider.extract(input.as_ref()));
    }
    values
}

fn type_name<T>() -> String {
    std::any::type_name::<T>().to_string()
}

#[test]
fn test_discovers_every_config_record() {
    let handle = ConfigHandle::new(root());
    let providers = discover(&handle, NAMED_CONFIG_POINTER_OUT);

    let pairs: Vec<(String, String)> = providers
        .iter()
        .map(|p| (p.input.clone(), p.output.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (NAMED_CONFIG_POINTER_OUT.to_string(), type_name::<HttpConfig>()),
            (type_name::<HttpConfig>(), type_name::<TlsConfig>()),
            (NAMED_CONFIG_POINTER_OUT.to_string(), type_name::<DatabaseConfig>()),
            (NAMED_CONFIG_POINTER_OUT.to_string(), type_name::<MetricsCONFIG>()),
        ]
    );
    assert!(providers.iter().all(|p| p.output != type_name::<Sub>()));
    assert!(providers.iter().all(|p| p.output != type_name::<InnerConfig>()));
}

#[test]
fn test_providers_resolve_live_values() {
    let handle = ConfigHandle::new(root());
    let providers = discover(&handle, NAMED_CONFIG_POINTER_OUT);

    // Resolve against a different live value than the one walked.
    let mut live = root();
    live.http.tls.cert = "live.pem".into();
    live.database.url = "postgres://db/live".into();
    let values = resolve(ConfigHandle::new(live), NAMED_CONFIG_POINTER_OUT, &providers);

    let tls = values[&type_name::<TlsConfig>()].as_ref().unwrap();
    assert_eq!(tls.get::<TlsConfig>().unwrap().cert, "live.pem");

    let database = values[&type_name::<DatabaseConfig>()].as_ref().unwrap();
    assert_eq!(database.get::<DatabaseConfig>().unwrap().url, "postgres://db/live");

    let metrics = values[&type_name::<MetricsCONFIG>()].as_ref().unwrap();
    assert!(metrics.get::<MetricsCONFIG>().unwrap().enabled);
}

#[test]
fn test_schema_lists_fields_in_order() {
    let config = root();
    let fields = config.fields();
    let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
    assert_eq!(names, ["name", "http", "sub", "database", "metrics"]);
    assert!(matches!(fields[0].node, FieldNode::Other));
    assert!(matches!(fields[1].node, FieldNode::Record(_)));
    // `Sub` does not look like a config record.
    assert!(matches!(fields[2].node, FieldNode::Other));
}

#[test]
fn test_walk_without_config_fields() {
    let providers = discover_tree(&Sub::default(), "root");
    assert!(providers.is_empty());
}

// Pointer chains.

#[derive(Debug, Clone, Default, ConfigTree)]
struct ChainRoot {
    app: AppConfig,
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct AppConfig {
    next: Box<Hop>,
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct Hop {
    next: Option<Box<HopConfig>>,
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct HopConfig {
    leaf: LeafConfig,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct LeafConfig {
    value: u32,
}

fn chain() -> ChainRoot {
    ChainRoot {
        app: AppConfig {
            next: Box::new(Hop {
                next: Some(Box::new(HopConfig {
                    leaf: LeafConfig { value: 7 },
                })),
            }),
        },
    }
}

#[test]
fn test_pointer_chain_keeps_enclosing_name() {
    let providers = discover(&ConfigHandle::new(chain()), "root");

    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].output, type_name::<AppConfig>());

    // Both pointer hops are transparent: the leaf provider reads from the
    // nearest plain config field, not from `HopConfig`.
    let last = providers.last().unwrap();
    assert_eq!(last.input, type_name::<AppConfig>());
    assert_eq!(last.output, type_name::<LeafConfig>());
    assert!(providers.iter().all(|p| p.output != type_name::<HopConfig>()));
}

#[test]
fn test_pointer_chain_provider_rejects_enclosing_value() {
    let providers = discover(&ConfigHandle::new(chain()), "root");
    let values = resolve(ConfigHandle::new(chain()), "root", &providers);

    // The leaf provider was discovered inside `HopConfig` but is fed the
    // `AppConfig` value, so it yields nothing at run time.
    assert!(values[&type_name::<AppConfig>()].is_some());
    assert!(values[&type_name::<LeafConfig>()].is_none());

    let leaf = providers.last().unwrap();
    let hop = ConfigHandle::new(HopConfig {
        leaf: LeafConfig { value: 9 },
    });
    let extracted = leaf.extract(Some(&hop)).unwrap();
    assert_eq!(extracted.get::<LeafConfig>(), Some(LeafConfig { value: 9 }));
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct EarlyReturnRoot {
    first: Option<Arc<HopConfig>>,
    skipped: DatabaseConfig,
}

#[test]
fn test_populated_pointer_ends_the_walk() {
    let populated = EarlyReturnRoot {
        first: Some(Arc::new(HopConfig::default())),
        skipped: DatabaseConfig::default(),
    };
    let providers = discover(&ConfigHandle::new(populated), "root");
    let outputs: Vec<&str> = providers.iter().map(|p| p.output.as_str()).collect();
    assert_eq!(outputs, [type_name::<LeafConfig>()]);
}

#[test]
fn test_empty_pointer_is_skipped() {
    let providers = discover(&ConfigHandle::new(EarlyReturnRoot::default()), "root");
    let outputs: Vec<&str> = providers.iter().map(|p| p.output.as_str()).collect();
    assert_eq!(outputs, [type_name::<DatabaseConfig>()]);
}

#[test]
fn test_extract_rechecks_input() {
    let providers = discover(&ConfigHandle::new(root()), "root");
    let http = &providers[0];

    assert!(http.extract(None).is_none());
    assert!(http.extract(Some(&ConfigHandle::new(LeafConfig::default()))).is_none());
    assert!(http.extract(Some(&ConfigHandle::new(()))).is_none());

    let shared = ConfigHandle::from_arc(Arc::new(root()));
    let extracted = http.extract(Some(&shared)).unwrap();
    assert_eq!(extracted.get::<HttpConfig>().unwrap().port, 8080);
}

/// Pointer to a record whose own name does not look like a config.
#[derive(Debug, Clone, Default, ConfigTree)]
struct BoxedRoot {
    inner: Box<Inner>,
    db: DatabaseConfig,
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct Inner {
    x: XConfig,
}

#[derive(Debug, Clone, Default, PartialEq, ConfigTree)]
struct XConfig {
    value: u32,
}

#[test]
fn test_pointer_to_any_record_is_followed() {
    let root = BoxedRoot {
        inner: Box::new(Inner {
            x: XConfig { value: 5 },
        }),
        db: DatabaseConfig::default(),
    };
    let providers = discover(&ConfigHandle::new(root.clone()), "root");
    let outputs: Vec<&str> = providers.iter().map(|p| p.output.as_str()).collect();
    assert_eq!(outputs, [type_name::<XConfig>()]);
    assert_eq!(providers[0].input, "root");

    let fields = root.fields();
    assert!(matches!(fields[0].node, FieldNode::Pointer(Some(_))));
}

/// Pointers to non-config values are plain fields.
#[derive(Debug, Clone, ConfigTree)]
struct OpaquePointers {
    label: Arc<str>,
    pool: Option<Box<Vec<u8>>>,
    db: DatabaseConfig,
}

#[test]
fn test_pointer_to_plain_value_is_not_followed() {
    let config = OpaquePointers {
        label: Arc::from("primary"),
        pool: Some(Box::new(vec![1, 2])),
        db: DatabaseConfig::default(),
    };
    let fields = config.fields();
    assert!(matches!(fields[0].node, FieldNode::Other));
    assert!(matches!(fields[1].node, FieldNode::Other));

    let providers = discover_tree(&config, "root");
    let outputs: Vec<&str> = providers.iter().map(|p| p.output.as_str()).collect();
    assert_eq!(outputs, [type_name::<DatabaseConfig>()]);
}

#[derive(Debug, Clone, Default, ConfigTree)]
struct SkipRoot {
    #[config(skip)]
    cache: CacheConfig,
    database: DatabaseConfig,
}

/// Deliberately not a `ConfigTree`.
#[derive(Debug, Clone, Default)]
struct CacheConfig {
    _size: usize,
}

#[test]
fn test_skipped_field_is_not_discovered() {
    let providers = discover_tree(&SkipRoot::default(), "root");
    let outputs: Vec<&str> = providers.iter().map(|p| p.output.as_str()).collect();
    assert_eq!(outputs, [type_name::<DatabaseConfig>()]);
}
