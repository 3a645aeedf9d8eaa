// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Built-in graph modules.
//!
//! - [`app`]: application identity
//! - [`config`]: config pointer supply, nested-config discovery and checks
//! - [`logger`]: logger configuration resolution
//! - [`tracing`]: `tracing` dispatch built from the logger configuration

pub mod app;
pub mod config;
pub mod logger;
pub mod tracing;
