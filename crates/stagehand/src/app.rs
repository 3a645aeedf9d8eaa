// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application identity.
//!
//! [`App`] is built once from [`AppOption`]s and shared read-only with every
//! component that needs to know what it is running inside.

use std::collections::HashMap;

use url::Url;

/// Graph name under which the application id is provided.
pub const NAMED_APP_ID: &str = "app.id";
/// Graph name under which the application name is provided.
pub const NAMED_APP_NAME: &str = "app.name";
/// Graph name under which the application version is provided.
pub const NAMED_APP_VERSION: &str = "app.version";
/// Graph name under which the application metadata is provided.
pub const NAMED_APP_METADATA: &str = "app.metadata";
/// Graph name under which the application endpoints are provided.
pub const NAMED_APP_ENDPOINT: &str = "app.endpoint";

/// Read-only view of an application identity.
pub trait AppInfo: Send + Sync {
    /// Instance id.
    fn id(&self) -> &str;
    /// Service name.
    fn name(&self) -> &str;
    /// Service version.
    fn version(&self) -> &str;
    /// Free-form metadata.
    fn metadata(&self) -> &HashMap<String, String>;
    /// Endpoints as strings, in registration order.
    fn endpoints(&self) -> Vec<String>;
}

/// Application identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct App {
    id: String,
    name: String,
    version: String,
    metadata: HashMap<String, String>,
    endpoints: Vec<Url>,
}

/// Option applied while building an [`App`].
pub type AppOption = Box<dyn FnOnce(&mut App) + Send>;

impl App {
    /// Build an identity from options, applied in order.
    pub fn new(opts: impl IntoIterator<Item = AppOption>) -> Self {
        let mut app = App::default();
        for opt in opts {
            opt(&mut app);
        }
        app
    }

    /// Raw endpoint URLs.
    pub fn endpoint_urls(&self) -> &[Url] {
        &self.endpoints
    }
}

impl AppInfo for App {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    fn endpoints(&self) -> Vec<String> {
        self.endpoints.iter().map(Url::to_string).collect()
    }
}

/// Set the instance id.
pub fn id(id: impl Into<String>) -> AppOption {
    let id = id.into();
    Box::new(move |app| app.id = id)
}

/// Set the service name.
pub fn name(name: impl Into<String>) -> AppOption {
    let name = name.into();
    Box::new(move |app| app.name = name)
}

/// Set the service version.
pub fn version(version: impl Into<String>) -> AppOption {
    let version = version.into();
    Box::new(move |app| app.version = version)
}

/// Replace the metadata map.
pub fn metadata(metadata: HashMap<String, String>) -> AppOption {
    Box::new(move |app| app.metadata = metadata)
}

/// Replace the endpoint list.
pub fn endpoints(endpoints: Vec<Url>) -> AppOption {
    Box::new(move |app| app.endpoints = endpoints)
}
