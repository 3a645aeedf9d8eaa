// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `tracing` logger module.
//!
//! Builds a [`Dispatch`] from the resolved [`LoggerConfig`]. With the
//! `tracing-module` feature (on by default) the module registers itself as
//! `"tracing"`, so every graph backend provides a `Dispatch` and fills an
//! empty `Dispatch` logger slot with it.

use ::tracing::{Dispatch, warn};
use stagehand::logger::{LoggerConfig, build_dispatch};

use crate::graph::{GraphOption, Invoke, Param, Provider, invoke, module as graph_module, provide};
#[cfg(feature = "tracing-module")]
use crate::registry::ModuleRegistration;

pub const MODULE_NAME: &str = "tracing";

pub fn module() -> GraphOption {
    graph_module(
        MODULE_NAME,
        vec![provide(
            Provider::new(|args| {
                let config = args.get::<LoggerConfig>(0)?;
                Ok(build_dispatch(&config)?)
            })
            .param(Param::of::<LoggerConfig>())
            .label("tracing::dispatch"),
        )],
    )
}

/// Install the graph's dispatch as the process-wide default. A default that
/// is already installed stays in place.
pub fn set_as_default() -> GraphOption {
    invoke(
        Invoke::new("tracing::set_global_default", |args| {
            let dispatch = args.get::<Dispatch>(0)?;
            if let Err(e) = ::tracing::dispatcher::set_global_default(dispatch) {
                warn!(error = %e, "Global tracing dispatch already set");
            }
            Ok(())
        })
        .param(Param::of::<Dispatch>()),
    )
}

#[cfg(feature = "tracing-module")]
static TRACING_MODULE: ModuleRegistration = ModuleRegistration {
    name: MODULE_NAME,
    creator: module,
};

#[cfg(feature = "tracing-module")]
inventory::submit! { &TRACING_MODULE }
