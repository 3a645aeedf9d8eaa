// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application identity module.

use std::sync::Arc;

use stagehand::app::{
    App, AppInfo, NAMED_APP_ENDPOINT, NAMED_APP_ID, NAMED_APP_METADATA, NAMED_APP_NAME,
    NAMED_APP_VERSION,
};

use crate::graph::{GraphOption, Provider, module, provide, supply, supply_named};

pub const MODULE_NAME: &str = "app";

/// Provide the identity as `Arc<App>` and `Arc<dyn AppInfo>`, plus each
/// non-empty attribute under its `app.*` name.
pub fn provide_app(app: Arc<App>) -> GraphOption {
    let info: Arc<dyn AppInfo> = app.clone();
    let mut opts = vec![
        supply(app.clone()),
        provide(Provider::supply(info).label("app::info")),
    ];

    if !app.id().is_empty() {
        opts.push(supply_named(NAMED_APP_ID, app.id().to_string()));
    }
    if !app.name().is_empty() {
        opts.push(supply_named(NAMED_APP_NAME, app.name().to_string()));
    }
    if !app.version().is_empty() {
        opts.push(supply_named(NAMED_APP_VERSION, app.version().to_string()));
    }
    if !app.metadata().is_empty() {
        opts.push(supply_named(NAMED_APP_METADATA, app.metadata().clone()));
    }
    let endpoints = app.endpoints();
    if !endpoints.is_empty() {
        opts.push(supply_named(NAMED_APP_ENDPOINT, endpoints));
    }

    module(MODULE_NAME, opts)
}
