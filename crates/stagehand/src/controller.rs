// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle controller.
//!
//! [`Stagehand`] owns the application identity, the root context and the
//! chosen backend, and enforces the single-use lifecycle:
//!
//! ```text
//! Idle --start--> Started --stop--> Stopped
//! ```
//!
//! A second `start` fails with [`Error::AlreadyStarted`]; `stop` before
//! `start` fails with [`Error::NotStarted`]. A stopped controller cannot be
//! restarted.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{Dispatch, debug, info, warn};

use crate::app::App;
use crate::backend::{Backend, BackendInitParams, BackendOption, ConfigSlot, DefaultBackend, Slot};
use crate::config::ConfigTree;
use crate::context::Context;
use crate::error::{Error, Result, TerminationError};
use crate::hooks::{Hook, HookPhase, run_hooks};
use crate::logger::LoggerHandle;
use crate::options::{LifecycleOption, Options};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Started,
    Stopped,
}

/// Application lifecycle controller.
///
/// `C` is the application config type, `L` the logger type. Both slots are
/// filled during backend init and read through [`Stagehand::config`] and
/// [`Stagehand::logger`].
pub struct Stagehand<C = (), L = Dispatch> {
    app: Arc<App>,
    ctx: Context,
    backend: Arc<dyn Backend>,
    logger_override: Option<LoggerHandle>,
    backend_options: Vec<BackendOption>,
    start_timeout: Duration,
    stop_timeout: Duration,
    before_start: Vec<Option<Hook>>,
    after_start: Vec<Option<Hook>>,
    before_stop: Vec<Option<Hook>>,
    after_stop: Vec<Option<Hook>>,

    state: Mutex<State>,
    // Serializes the state check with backend init.
    init_gate: tokio::sync::Mutex<()>,
    config: RwLock<Option<C>>,
    logger: RwLock<Option<L>>,
}

impl Stagehand {
    /// Controller with no config and a `tracing` logger.
    pub fn new(opts: impl IntoIterator<Item = LifecycleOption>) -> Self {
        Self::build(opts)
    }
}

impl<C> Stagehand<C, Dispatch>
where
    C: ConfigTree + Default + Clone,
{
    /// Controller with config type `C` and a `tracing` logger.
    pub fn with_config(opts: impl IntoIterator<Item = LifecycleOption>) -> Self {
        Self::build(opts)
    }
}

impl<L> Stagehand<(), L>
where
    L: Any + Default + Clone + Send + Sync,
{
    /// Controller with no config and logger type `L`.
    pub fn with_logger(opts: impl IntoIterator<Item = LifecycleOption>) -> Self {
        Self::build(opts)
    }
}

impl<C, L> Stagehand<C, L>
where
    C: ConfigTree + Default + Clone,
    L: Any + Default + Clone + Send + Sync,
{
    /// Controller with config type `C` and logger type `L`.
    pub fn build(opts: impl IntoIterator<Item = LifecycleOption>) -> Self {
        let Options {
            app_info,
            context,
            backend,
            logger,
            options,
            start_timeout,
            stop_timeout,
            before_start,
            after_start,
            before_stop,
            after_stop,
        } = Options::from_options(opts);

        let app = Arc::new(App::new(app_info));
        let ctx = context
            .unwrap_or_default()
            .with_cancel()
            .with_app(app.clone());

        Self {
            app,
            ctx,
            backend: backend.unwrap_or_else(|| Arc::new(DefaultBackend)),
            logger_override: logger,
            backend_options: options,
            start_timeout,
            stop_timeout,
            before_start,
            after_start,
            before_stop,
            after_stop,
            state: Mutex::new(State::Idle),
            init_gate: tokio::sync::Mutex::new(()),
            config: RwLock::new(None),
            logger: RwLock::new(None),
        }
    }

    /// Initialize the backend, then run before-start hooks, start the
    /// backend and run after-start hooks.
    ///
    /// Only the first call can succeed. A failed init leaves the controller
    /// idle; a failure after init leaves it started.
    pub async fn start(&self) -> Result<()> {
        {
            let _gate = self.init_gate.lock().await;
            if self.state() != State::Idle {
                return Err(Error::AlreadyStarted);
            }

            let mut logger: Option<L> = self
                .logger_override
                .as_ref()
                .and_then(LoggerHandle::downcast::<L>);
            if self.logger_override.is_some() && logger.is_none() {
                warn!(
                    expected = std::any::type_name::<L>(),
                    "Ignoring logger option of a different type"
                );
            }
            let mut config: Option<C> = Some(C::default());

            let params = BackendInitParams {
                app: self.app.clone(),
                config: ConfigSlot::new(&mut config),
                logger: Slot::new(&mut logger),
                options: self.backend_options.clone(),
                start_timeout: self.start_timeout,
                stop_timeout: self.stop_timeout,
            };
            self.backend
                .init(params)
                .await
                .map_err(|e| Error::BackendInit {
                    backend: self.backend.name().to_string(),
                    source: Box::new(e),
                })?;

            if logger.is_none() {
                logger = process_dispatch::<L>();
            }

            *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
            *self.logger.write().unwrap_or_else(PoisonError::into_inner) = logger;
            self.set_state(State::Started);
            debug!(backend = self.backend.name(), "Backend initialized");
        }

        run_hooks(&self.ctx, HookPhase::BeforeStart, &self.before_start).await?;

        self.backend
            .start(self.ctx.with_timeout(self.start_timeout))
            .await
            .map_err(|e| Error::BackendStart {
                backend: self.backend.name().to_string(),
                source: Box::new(e),
            })?;

        run_hooks(&self.ctx, HookPhase::AfterStart, &self.after_start).await?;

        info!(backend = self.backend.name(), "Application started");
        Ok(())
    }

    /// Run before-stop hooks, stop the backend, cancel the root context and
    /// run after-stop hooks.
    pub async fn stop(&self) -> Result<()> {
        if self.state() == State::Idle {
            return Err(Error::NotStarted);
        }

        run_hooks(&self.ctx, HookPhase::BeforeStop, &self.before_stop).await?;

        self.backend
            .stop(self.ctx.with_timeout(self.stop_timeout))
            .await
            .map_err(|e| Error::BackendStop {
                backend: self.backend.name().to_string(),
                source: Box::new(e),
            })?;

        self.ctx.cancel();
        self.set_state(State::Stopped);

        run_hooks(&self.ctx, HookPhase::AfterStop, &self.after_stop).await?;

        info!(backend = self.backend.name(), "Application stopped");
        Ok(())
    }

    /// Channel resolving once the backend reports termination.
    ///
    /// The value is always an error: [`Error::NotStarted`] when called before
    /// `start`, otherwise [`Error::Terminated`] carrying the cause. Every call
    /// spawns its own waiter; it must be called inside a tokio runtime.
    pub fn wait(&self) -> oneshot::Receiver<Result<()>> {
        let (tx, rx) = oneshot::channel();

        if self.state() == State::Idle {
            let _ = tx.send(Err(Error::NotStarted));
            return rx;
        }

        let backend = self.backend.clone();
        tokio::spawn(async move {
            let cause = backend.wait().await;
            debug!(?cause, "Backend terminated");
            let _ = tx.send(Err(Error::Terminated(TerminationError { cause })));
        });

        rx
    }

    /// Start, block until termination, then stop.
    ///
    /// Returns what ended the run.
    pub async fn run(&self) -> Result<TerminationError> {
        self.start().await?;
        let cause = self.backend.wait().await;
        info!(?cause, "Shutting down");
        self.stop().await?;
        Ok(TerminationError { cause })
    }

    /// Resolved config, or `C::default()` before init.
    pub fn config(&self) -> C {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    /// Resolved logger, or `L::default()` before init.
    pub fn logger(&self) -> L {
        self.logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    /// Application identity.
    pub fn app(&self) -> Arc<App> {
        self.app.clone()
    }

    /// Root context, cancelled by `stop`.
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    pub fn is_started(&self) -> bool {
        self.state() != State::Idle
    }

    fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: State) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// The process default `tracing` dispatcher, when `L` is [`Dispatch`].
fn process_dispatch<L: Any + Clone>() -> Option<L> {
    let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
    (&dispatch as &dyn Any).downcast_ref::<L>().cloned()
}
