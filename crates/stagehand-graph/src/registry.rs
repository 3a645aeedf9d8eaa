// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process-wide module registry.
//!
//! Extensions register a creator under a feature name, either at link time
//! through `inventory::submit!` or at run time through [`add`]. The graph
//! backend folds every registered module into each graph it builds.
//!
//! ```ignore
//! static METRICS: ModuleRegistration = ModuleRegistration {
//!     name: "metrics",
//!     creator: metrics_module,
//! };
//! inventory::submit! { &METRICS }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::graph::{GraphOption, module};

/// Creates the graph options of one module.
pub type ModuleCreator = Arc<dyn Fn() -> GraphOption + Send + Sync>;

/// Link-time module registration.
pub struct ModuleRegistration {
    /// Feature name; a run-time registration with the same name replaces it.
    pub name: &'static str,
    pub creator: fn() -> GraphOption,
}

// Register ModuleRegistration with inventory
inventory::collect!(&'static ModuleRegistration);

static MODULES: Lazy<RwLock<BTreeMap<String, ModuleCreator>>> =
    Lazy::new(|| RwLock::new(BTreeMap::new()));

/// Register `creator` under `name`, replacing any earlier registration.
pub fn add<F>(name: impl Into<String>, creator: F)
where
    F: Fn() -> GraphOption + Send + Sync + 'static,
{
    let name = name.into();
    debug!(module = %name, "Registering module");
    MODULES
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(name, Arc::new(creator));
}

/// Drop a run-time registration. Link-time registrations stay.
pub fn remove(name: &str) -> bool {
    MODULES
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(name)
        .is_some()
}

fn entries() -> BTreeMap<String, ModuleCreator> {
    let mut entries: BTreeMap<String, ModuleCreator> = BTreeMap::new();
    for registration in inventory::iter::<&'static ModuleRegistration> {
        let creator = registration.creator;
        entries.insert(registration.name.to_string(), Arc::new(creator));
    }
    let dynamic = MODULES
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for (name, creator) in dynamic.iter() {
        entries.insert(name.clone(), creator.clone());
    }
    entries
}

/// Names of every registered module, sorted.
pub fn registered_names() -> Vec<String> {
    entries().into_keys().collect()
}

/// Every registered module as one option, in name order.
pub fn provide_registered() -> GraphOption {
    let modules = entries()
        .into_iter()
        .map(|(name, creator)| module(name, vec![creator()]))
        .collect();
    GraphOption::Options(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::supply_named;

    #[test]
    fn test_add_overwrites() {
        add("registry-unit-overwrite", || supply_named("registry.unit", 1u8));
        add("registry-unit-overwrite", || supply_named("registry.unit", 2u8));

        let names = registered_names();
        assert_eq!(
            names
                .iter()
                .filter(|n| n.as_str() == "registry-unit-overwrite")
                .count(),
            1
        );
        assert!(remove("registry-unit-overwrite"));
        assert!(!remove("registry-unit-overwrite"));
    }

    #[test]
    fn test_names_are_sorted() {
        let names = registered_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
