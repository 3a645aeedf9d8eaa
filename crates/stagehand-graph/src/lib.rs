// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider-graph backend for stagehand.
//!
//! [`GraphBackend`] runs an application as a graph of providers addressed by
//! type, by name (`name:"app.name"`) or by group (`group:"config.files"`).
//! Constructors append start/stop hooks to the graph's [`Lifecycle`]; any
//! value can end the waiting phase through the [`Shutdowner`].
//!
//! # Built-in modules
//!
//! - **app**: `Arc<App>`, `Arc<dyn AppInfo>` and the `app.*` names
//! - **logger**: resolved [`LoggerConfig`](stagehand::LoggerConfig)
//! - **config**: supplied/loaded config pointers and one named provider per
//!   nested config record
//! - **tracing** (self-registered): `tracing::Dispatch` built from the logger
//!   config
//!
//! # Example
//!
//! ```ignore
//! use stagehand::{Stagehand, backend::backend_option, hook, options};
//! use stagehand_graph::{GraphBackend, Invoke, Lifecycle, LifecycleHook, Param, invoke};
//!
//! let server = invoke(
//!     Invoke::new("server", |args| {
//!         let lifecycle = args.get::<Lifecycle>(0)?;
//!         lifecycle.append(LifecycleHook::new("server").on_start(hook(|_| async { Ok(()) })));
//!         Ok(())
//!     })
//!     .param(Param::of::<Lifecycle>()),
//! );
//!
//! let app = Stagehand::new([
//!     options::backend(GraphBackend::new()),
//!     options::backend_options(vec![backend_option(server)]),
//! ]);
//! let cause = app.run().await?;
//! ```
//!
//! Modules that should be part of every graph register themselves in the
//! [`registry`].

mod backend;
mod error;
pub mod graph;
pub mod lifecycle;
pub mod modules;
pub mod registry;

pub use backend::GraphBackend;
pub use error::{GraphError, Result};
pub use graph::{
    Args, Graph, GraphOption, Invoke, Key, Param, Provider, Value, invoke, module, options,
    provide, start_timeout, stop_timeout, supply, supply_named,
};
pub use lifecycle::{Lifecycle, LifecycleHook, Shutdowner};
pub use registry::ModuleRegistration;
