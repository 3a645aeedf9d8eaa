// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stagehand - application lifecycle runtime.
//!
//! Stagehand drives a long-lived process through a single-use lifecycle:
//! backend init, ordered start with hooks, wait for a termination signal,
//! ordered stop with hooks. What actually runs inside is decided by a
//! pluggable [`Backend`].
//!
//! # Features
//!
//! - **Lifecycle Controller**: `start`/`stop`/`wait` with a strict state machine
//! - **Hooks**: before/after start and stop, run in registration order
//! - **Backends**: no-op [`DefaultBackend`] or any [`Backend`] implementation
//! - **Typed Slots**: caller-chosen config and logger types, filled during init
//! - **Config Discovery**: nested `*Config` records exposed as providers
//! - **Signals**: SIGINT/SIGTERM surfaced as [`TerminationError`]
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use stagehand::{Stagehand, app, hook, options};
//!
//! #[tokio::main]
//! async fn main() -> stagehand::Result<()> {
//!     let app = Stagehand::new([
//!         options::app_info(vec![app::name("billing"), app::version("1.2.0")]),
//!         options::start_timeout(Duration::from_secs(5)),
//!         options::after_start(hook(|_ctx| async {
//!             tracing::info!("ready");
//!             Ok(())
//!         })),
//!     ]);
//!
//!     let cause = app.run().await?;
//!     tracing::info!(%cause, "exiting");
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Config types derive [`ConfigTree`] so backends can walk them:
//!
//! ```ignore
//! #[derive(Clone, Default, ConfigTree)]
//! struct ServiceConfig {
//!     http: HttpConfig,
//!     logger: stagehand::logger::LoggerConfig,
//! }
//!
//! let app = Stagehand::<ServiceConfig>::with_config(opts);
//! ```

// Lets `#[derive(ConfigTree)]` resolve `::stagehand` inside this crate.
extern crate self as stagehand;

pub mod app;
pub mod backend;
pub mod config;
pub mod context;
mod controller;
mod error;
pub mod hooks;
pub mod logger;
pub mod options;
pub mod signals;
pub mod tags;

pub use app::{App, AppInfo};
pub use backend::{Backend, BackendInitParams, BackendOption, DefaultBackend};
pub use config::{ConfigHandle, ConfigTree};
pub use context::{Context, ContextError};
pub use controller::Stagehand;
pub use error::{BoxError, Error, Result, TerminationError};
pub use hooks::{Hook, hook};
pub use logger::{LoggerConfig, LoggerHandle};
pub use options::{DEFAULT_TIMEOUT, LifecycleOption};
pub use signals::{Signal, TerminationCause};
pub use stagehand_macros::ConfigTree;

// Re-export for downstream backends
pub use async_trait::async_trait;
pub use tracing;
