// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle options.
//!
//! Options are functions applied in order to a default [`Options`] value.
//! Scalar options overwrite earlier ones; hook options append.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app::AppOption;
use crate::backend::{Backend, BackendOption};
use crate::context::Context;
use crate::hooks::Hook;
use crate::logger::LoggerHandle;

/// Default start and stop timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Function applied to [`Options`].
pub type LifecycleOption = Box<dyn FnOnce(&mut Options) + Send>;

/// Accumulated lifecycle options.
pub struct Options {
    pub(crate) app_info: Vec<AppOption>,
    pub(crate) context: Option<Context>,
    pub(crate) backend: Option<Arc<dyn Backend>>,
    pub(crate) logger: Option<LoggerHandle>,
    pub(crate) options: Vec<BackendOption>,
    pub(crate) start_timeout: Duration,
    pub(crate) stop_timeout: Duration,
    pub(crate) before_start: Vec<Option<Hook>>,
    pub(crate) after_start: Vec<Option<Hook>>,
    pub(crate) before_stop: Vec<Option<Hook>>,
    pub(crate) after_stop: Vec<Option<Hook>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            app_info: Vec::new(),
            context: None,
            backend: None,
            logger: None,
            options: Vec::new(),
            start_timeout: DEFAULT_TIMEOUT,
            stop_timeout: DEFAULT_TIMEOUT,
            before_start: Vec::new(),
            after_start: Vec::new(),
            before_stop: Vec::new(),
            after_stop: Vec::new(),
        }
    }
}

impl Options {
    /// Apply `opts` in order to the defaults.
    pub fn from_options(opts: impl IntoIterator<Item = LifecycleOption>) -> Self {
        let mut options = Options::default();
        for opt in opts {
            opt(&mut options);
        }
        options
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Extra backend options, in the order given.
    pub fn backend_options(&self) -> &[BackendOption] {
        &self.options
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("logger", &self.logger)
            .field("options", &self.options.len())
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .field("before_start", &self.before_start.len())
            .field("after_start", &self.after_start.len())
            .field("before_stop", &self.before_stop.len())
            .field("after_stop", &self.after_stop.len())
            .finish_non_exhaustive()
    }
}

/// Identity options, replacing any given earlier.
pub fn app_info(opts: Vec<AppOption>) -> LifecycleOption {
    Box::new(move |o| o.app_info = opts)
}

/// Parent context of the lifecycle.
pub fn context(ctx: Context) -> LifecycleOption {
    Box::new(move |o| o.context = Some(ctx))
}

/// Backend that runs the application.
pub fn backend(backend: impl Backend + 'static) -> LifecycleOption {
    let backend: Arc<dyn Backend> = Arc::new(backend);
    Box::new(move |o| o.backend = Some(backend))
}

/// Explicit logger, installed when it matches the controller's logger type.
pub fn logger(logger: impl Into<LoggerHandle>) -> LifecycleOption {
    let logger = logger.into();
    Box::new(move |o| o.logger = Some(logger))
}

/// Backend-specific options, replacing any given earlier.
pub fn backend_options(opts: Vec<BackendOption>) -> LifecycleOption {
    Box::new(move |o| o.options = opts)
}

pub fn start_timeout(timeout: Duration) -> LifecycleOption {
    Box::new(move |o| o.start_timeout = timeout)
}

pub fn stop_timeout(timeout: Duration) -> LifecycleOption {
    Box::new(move |o| o.stop_timeout = timeout)
}

/// Run `hook` before the backend starts.
pub fn before_start(hook: Hook) -> LifecycleOption {
    before_start_hook(Some(hook))
}

/// Run `hook` once the backend has started.
pub fn after_start(hook: Hook) -> LifecycleOption {
    after_start_hook(Some(hook))
}

/// Run `hook` before the backend stops.
pub fn before_stop(hook: Hook) -> LifecycleOption {
    before_stop_hook(Some(hook))
}

/// Run `hook` once the backend has stopped.
pub fn after_stop(hook: Hook) -> LifecycleOption {
    after_stop_hook(Some(hook))
}

pub fn before_start_hook(hook: Option<Hook>) -> LifecycleOption {
    Box::new(move |o| o.before_start.push(hook))
}

pub fn after_start_hook(hook: Option<Hook>) -> LifecycleOption {
    Box::new(move |o| o.after_start.push(hook))
}

pub fn before_stop_hook(hook: Option<Hook>) -> LifecycleOption {
    Box::new(move |o| o.before_stop.push(hook))
}

pub fn after_stop_hook(hook: Option<Hook>) -> LifecycleOption {
    Box::new(move |o| o.after_stop.push(hook))
}

/// Timeout options read from the environment.
///
/// # Optional Environment Variables
/// - `STAGEHAND_START_TIMEOUT_MS` - Start timeout (default: 15000)
/// - `STAGEHAND_STOP_TIMEOUT_MS` - Stop timeout (default: 15000)
///
/// Unset or unparsable variables produce no option.
pub fn from_env() -> Vec<LifecycleOption> {
    let mut opts = Vec::new();

    if let Some(ms) = env_millis("STAGEHAND_START_TIMEOUT_MS") {
        opts.push(start_timeout(Duration::from_millis(ms)));
    }

    if let Some(ms) = env_millis("STAGEHAND_STOP_TIMEOUT_MS") {
        opts.push(stop_timeout(Duration::from_millis(ms)));
    }

    opts
}

fn env_millis(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
