// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Logger configuration and `tracing` subscriber construction.
//!
//! [`LoggerConfig`] is a plain serde record so it can live inside an
//! application config; when it does, the discovery walker exposes it under
//! [`NAMED_LOGGER_CONFIG_SUPPLIED`] and the graph backend's logger module
//! picks it up.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Dispatch, Level};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

use crate::ConfigTree;

/// Graph name of the resolved logger config.
pub const NAMED_LOGGER_CONFIG: &str = "logger.config";
/// Graph name under which a caller-supplied logger config is looked up.
/// Equal to the type name of [`LoggerConfig`], which is also the name the
/// discovery walker gives it.
pub const NAMED_LOGGER_CONFIG_SUPPLIED: &str = "stagehand::logger::LoggerConfig";

/// Logger errors.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to install global subscriber: {0}")]
    Install(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ConfigTree)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line.
    pub caller: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            caller: false,
        }
    }
}

impl LoggerConfig {
    /// Debug level, text output, with source locations.
    pub fn debug_text() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Text,
            caller: true,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format_json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn with_format_text(mut self) -> Self {
        self.format = LogFormat::Text;
        self
    }

    pub fn with_caller(mut self, caller: bool) -> Self {
        self.caller = caller;
        self
    }
}

/// Parse a level name (`trace`, `debug`, `info`, `warn`/`warning`, `error`),
/// case-insensitively.
pub fn parse_level(level: &str) -> Result<Level, LoggerError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(Level::WARN),
        other => Level::from_str(other).map_err(|_| LoggerError::InvalidLevel(level.to_string())),
    }
}

/// Build a dispatcher for `config`. `RUST_LOG` directives refine the level.
pub fn build_dispatch(config: &LoggerConfig) -> Result<Dispatch, LoggerError> {
    let level = parse_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let fmt: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_file(config.caller)
            .with_line_number(config.caller)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(false)
            .with_target(true)
            .with_file(config.caller)
            .with_line_number(config.caller)
            .boxed(),
    };

    let subscriber = Registry::default().with(fmt).with(filter);
    Ok(Dispatch::new(subscriber))
}

/// Build a dispatcher for `config` and install it process-wide.
pub fn init_subscriber(config: &LoggerConfig) -> Result<Dispatch, LoggerError> {
    let dispatch = build_dispatch(config)?;
    tracing::dispatcher::set_global_default(dispatch.clone())
        .map_err(|e| LoggerError::Install(e.to_string()))?;
    Ok(dispatch)
}

/// Span tagging everything recorded inside it with a component name.
pub fn with_name(name: &str) -> tracing::Span {
    tracing::info_span!("component", logger = name)
}

/// Logger supplied by the caller, overriding whatever the backend would
/// resolve.
///
/// The controller installs it only when it matches its logger type.
#[derive(Clone)]
pub enum LoggerHandle {
    Dispatch(Dispatch),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl LoggerHandle {
    /// Wrap a logger of any type.
    pub fn custom<T: Any + Send + Sync>(logger: T) -> Self {
        LoggerHandle::Custom(Arc::new(logger))
    }

    /// The logger as `L`, if that is what it holds.
    pub fn downcast<L: Any + Clone>(&self) -> Option<L> {
        match self {
            LoggerHandle::Dispatch(dispatch) => (dispatch as &dyn Any).downcast_ref::<L>().cloned(),
            LoggerHandle::Custom(value) => value.downcast_ref::<L>().cloned(),
        }
    }
}

impl From<Dispatch> for LoggerHandle {
    fn from(dispatch: Dispatch) -> Self {
        LoggerHandle::Dispatch(dispatch)
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerHandle::Dispatch(_) => f.write_str("LoggerHandle::Dispatch"),
            LoggerHandle::Custom(_) => f.write_str("LoggerHandle::Custom"),
        }
    }
}
