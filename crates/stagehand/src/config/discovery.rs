// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Nested configuration discovery.
//!
//! Walks a [`ConfigTree`] and produces one [`ConfigProvider`] per nested
//! record whose type name ends with `config` (case-insensitive). Each
//! provider names the value it reads (`input`) and the value it produces
//! (`output`, the nested record's type name), so a dependency graph can wire
//! the chain `root -> child -> grandchild` without knowing the types.

use tracing::debug;

use super::{ConfigHandle, ConfigTree, FieldNode};

/// Type-name suffix marking a record as an independently provided config.
pub const CONFIG_STRUCT_SUFFIX: &str = "config";

/// Whether `type_name` designates a config record.
pub fn is_config_type(type_name: &str) -> bool {
    type_name.to_lowercase().ends_with(CONFIG_STRUCT_SUFFIX)
}

/// Extracts one nested config record from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigProvider {
    /// Name of the value this provider consumes.
    pub input: String,
    /// Name of the value this provider produces.
    pub output: String,
    /// Field position inside the parent record.
    pub field_index: usize,
    /// Field name inside the parent record.
    pub field_name: &'static str,
    /// Type name the input must have.
    pub parent_type: &'static str,
}

impl ConfigProvider {
    /// Pulls the nested record out of `input`.
    ///
    /// Returns `None` when the input is missing, is not a record of the
    /// parent type, or holds an empty pointer at the field.
    pub fn extract(&self, input: Option<&ConfigHandle>) -> Option<ConfigHandle> {
        let tree = input?.tree()?;
        if tree.type_name() != self.parent_type {
            debug!(
                provider = %self.output,
                expected = self.parent_type,
                found = tree.type_name(),
                "config provider input has unexpected type"
            );
            return None;
        }
        tree.field_value(self.field_index)
    }
}

/// Lists providers for every nested config record reachable from `root`.
pub fn discover(root: &ConfigHandle, root_name: &str) -> Vec<ConfigProvider> {
    let mut providers = Vec::new();
    if let Some(tree) = root.tree() {
        walk(tree, root_name, &mut providers);
    }
    providers
}

/// Same as [`discover`] for a borrowed tree.
pub fn discover_tree(root: &dyn ConfigTree, root_name: &str) -> Vec<ConfigProvider> {
    let mut providers = Vec::new();
    walk(root, root_name, &mut providers);
    providers
}

fn walk(tree: &dyn ConfigTree, name: &str, out: &mut Vec<ConfigProvider>) {
    let parent_type = tree.type_name();
    for (index, field) in tree.fields().into_iter().enumerate() {
        match field.node {
            FieldNode::Record(inner) if is_config_type(field.type_name) => {
                out.push(ConfigProvider {
                    input: name.to_string(),
                    output: field.type_name.to_string(),
                    field_index: index,
                    field_name: field.name,
                    parent_type,
                });
                walk(inner, field.type_name, out);
            }
            // A populated pointer is followed under the current name and
            // ends the walk of this record.
            FieldNode::Pointer(Some(inner)) => {
                walk(inner, name, out);
                return;
            }
            _ => {}
        }
    }
}
