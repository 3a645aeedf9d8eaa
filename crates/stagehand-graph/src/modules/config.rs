// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Config module.
//!
//! The controller's config value enters the graph as
//! `name:"config.pointer.in"`. Whatever loads it publishes the loaded value
//! as `name:"config.pointer.out"`, which the module requires. Every nested
//! config record reachable from the value gets its own named provider,
//! keyed by the record's type name, that reads the record out of its
//! parent at resolution time.
//!
//! Config values travel through the graph as [`ConfigHandle`]s; nested
//! records as `Option<ConfigHandle>` (empty when the parent no longer has
//! the expected shape).

use std::any::Any;

use stagehand::config::discovery::{ConfigProvider, discover};
use stagehand::config::{
    ConfigError, ConfigHandle, GROUP_CONFIG_FILES, NAMED_CONFIG_POINTER_IN,
    NAMED_CONFIG_POINTER_OUT, struct_check,
};

use crate::graph::{
    GraphOption, Invoke, Param, Provider, Value, downcast, invoke, module as graph_module,
    options, provide,
};

pub const MODULE_NAME: &str = "config";

/// Checks the supplied config and requires a loaded one.
pub fn module() -> GraphOption {
    graph_module(
        MODULE_NAME,
        vec![
            invoke(
                Invoke::new("config::struct_check", |args| {
                    let input = args.value(0).and_then(config_node);
                    struct_check(input.as_ref())?;
                    Ok(())
                })
                .param(Param::named(NAMED_CONFIG_POINTER_IN).optional()),
            ),
            invoke(
                Invoke::new("config::ensure_out", |_| Ok(()))
                    .param(Param::named(NAMED_CONFIG_POINTER_OUT)),
            ),
        ],
    )
}

/// Provide `config` as the input value, plus one provider per nested
/// config record.
pub fn supply_config_pointer(config: ConfigHandle) -> GraphOption {
    let providers = discover(&config, NAMED_CONFIG_POINTER_OUT);
    let mut opts = Vec::with_capacity(providers.len() + 1);
    opts.push(provide(
        Provider::supply(config)
            .named(NAMED_CONFIG_POINTER_IN)
            .label("config::pointer"),
    ));
    opts.extend(providers.into_iter().map(inner_config_provider));
    options(opts)
}

fn inner_config_provider(provider: ConfigProvider) -> GraphOption {
    let input = provider.input.clone();
    let output = provider.output.clone();
    let label = format!("config::{}[{}]", provider.parent_type, provider.field_name);
    provide(
        Provider::new(move |args| Ok(provider.extract(args.value(0).and_then(config_node).as_ref())))
            .named(output)
            .param(Param::named(input))
            .label(label),
    )
}

/// Provide `config` as the loaded value.
pub fn supply_config(config: ConfigHandle) -> GraphOption {
    provide(
        Provider::supply(config)
            .named(NAMED_CONFIG_POINTER_OUT)
            .label("config::supplied"),
    )
}

/// Use the supplied value as the loaded one, for configs built in code.
pub fn passthrough() -> GraphOption {
    provide(
        Provider::new(|args| {
            args.value(0)
                .and_then(config_node)
                .ok_or_else(|| ConfigError::Nil.into())
        })
        .named(NAMED_CONFIG_POINTER_OUT)
        .param(Param::named(NAMED_CONFIG_POINTER_IN))
        .label("config::passthrough"),
    )
}

/// Add a file to the `config.files` group.
pub fn supply_config_file(file: impl Into<String>) -> GraphOption {
    provide(
        Provider::supply(file.into())
            .group(GROUP_CONFIG_FILES)
            .label("config::file"),
    )
}

/// Add every file to the `config.files` group.
pub fn supply_config_files(files: Vec<String>) -> GraphOption {
    provide(Provider::many(GROUP_CONFIG_FILES, move |_| Ok(files.clone())).label("config::files"))
}

/// Handle held by a graph value, looking through `Option<ConfigHandle>`.
pub fn config_node(value: &Value) -> Option<ConfigHandle> {
    if let Some(handle) = value.downcast_ref::<ConfigHandle>() {
        return Some(handle.clone());
    }
    value
        .downcast_ref::<Option<ConfigHandle>>()
        .and_then(Clone::clone)
}

/// Config record of type `T` held by a graph value, directly or through a
/// handle.
pub fn config_value<T: Any + Clone>(value: &Value) -> Option<T> {
    downcast::<T>(value).or_else(|| config_node(value)?.get::<T>())
}
