// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Logger module.
//!
//! Resolves the logger configuration once and provides it both as
//! `name:"logger.config"` and as a plain [`LoggerConfig`]. An explicit
//! [`supply_config`] wins over a `LoggerConfig` found inside the
//! application config, which wins over the default.

use stagehand::logger::{LoggerConfig, NAMED_LOGGER_CONFIG, NAMED_LOGGER_CONFIG_SUPPLIED};

use super::config::config_value;
use crate::graph::{GraphOption, Param, Provider, Value, module as graph_module, provide, supply_named};

pub const MODULE_NAME: &str = "logger";

/// Graph name of a logger config supplied through [`supply_config`].
pub const NAMED_LOGGER_CONFIG_OVERRIDE: &str = "logger.config.override";

pub fn module() -> GraphOption {
    graph_module(
        MODULE_NAME,
        vec![
            provide(
                Provider::new(|args| Ok(config_or_default([args.value(0), args.value(1)])))
                    .named(NAMED_LOGGER_CONFIG)
                    .param(Param::named(NAMED_LOGGER_CONFIG_OVERRIDE).optional())
                    .param(Param::named(NAMED_LOGGER_CONFIG_SUPPLIED).optional())
                    .label("logger::config"),
            ),
            provide(
                Provider::new(|args| Ok(args.get::<LoggerConfig>(0)?))
                    .param(Param::named(NAMED_LOGGER_CONFIG))
                    .label("logger::config_value"),
            ),
        ],
    )
}

/// Use `config` regardless of what the application config holds.
pub fn supply_config(config: LoggerConfig) -> GraphOption {
    supply_named(NAMED_LOGGER_CONFIG_OVERRIDE, config)
}

fn config_or_default<const N: usize>(candidates: [Option<&Value>; N]) -> LoggerConfig {
    candidates
        .into_iter()
        .flatten()
        .find_map(config_value::<LoggerConfig>)
        .unwrap_or_default()
}
