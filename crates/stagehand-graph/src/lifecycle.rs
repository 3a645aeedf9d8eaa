// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Start/stop hooks registered by constructors, and the shutdowner.
//!
//! Constructors receive a [`Lifecycle`] and append hooks to it. When the
//! graph starts, `on_start` hooks run in registration order. When it stops,
//! `on_stop` hooks of the hooks that started run in reverse order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use stagehand::hooks::Hook;
use stagehand::{Context, TerminationCause};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::error::{GraphError, Result};

/// Pair of start/stop hooks appended by one constructor.
#[derive(Clone)]
pub struct LifecycleHook {
    pub name: String,
    pub on_start: Option<Hook>,
    pub on_stop: Option<Hook>,
}

impl LifecycleHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_start: None,
            on_stop: None,
        }
    }

    pub fn on_start(mut self, hook: Hook) -> Self {
        self.on_start = Some(hook);
        self
    }

    pub fn on_stop(mut self, hook: Hook) -> Self {
        self.on_stop = Some(hook);
        self
    }
}

impl std::fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHook")
            .field("name", &self.name)
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

#[derive(Default)]
struct LifecycleState {
    hooks: Vec<LifecycleHook>,
    /// Number of leading hooks whose `on_start` completed.
    started: usize,
}

/// Hook list shared by every constructor of one graph.
#[derive(Clone, Default)]
pub struct Lifecycle {
    state: Arc<Mutex<LifecycleState>>,
}

impl Lifecycle {
    fn state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, hook: LifecycleHook) {
        self.state().hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.state().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<LifecycleHook> {
        self.state().hooks.clone()
    }

    fn set_started(&self, started: usize) {
        self.state().started = started;
    }

    fn take_started(&self) -> usize {
        std::mem::take(&mut self.state().started)
    }

    /// Run `on_start` hooks in order. On failure the hooks that already
    /// started are stopped again, in reverse, before the error is returned.
    pub async fn start(&self, ctx: &Context) -> Result<()> {
        let hooks = self.snapshot();
        for (index, hook) in hooks.iter().enumerate() {
            if let Some(on_start) = &hook.on_start {
                debug!(callee = %hook.name, "OnStart hook executing");
                let began = Instant::now();
                if let Err(source) = on_start(ctx.clone()).await {
                    error!(callee = %hook.name, error = %source, "OnStart hook failed");
                    self.set_started(0);
                    if let Err(rollback) = stop_hooks(ctx, &hooks[..index]).await {
                        error!(error = %rollback, "Rollback after failed start");
                    }
                    return Err(GraphError::Hook {
                        phase: "OnStart",
                        name: hook.name.clone(),
                        source,
                    });
                }
                debug!(callee = %hook.name, runtime = ?began.elapsed(), "OnStart hook executed");
            }
            self.set_started(index + 1);
        }
        Ok(())
    }

    /// Run `on_stop` hooks of started hooks in reverse order. Every hook runs;
    /// failures are collected.
    pub async fn stop(&self, ctx: &Context) -> Result<()> {
        let hooks = self.snapshot();
        let started = self.take_started().min(hooks.len());
        stop_hooks(ctx, &hooks[..started]).await
    }
}

async fn stop_hooks(ctx: &Context, hooks: &[LifecycleHook]) -> Result<()> {
    let mut errors = Vec::new();
    for hook in hooks.iter().rev() {
        let Some(on_stop) = &hook.on_stop else {
            continue;
        };
        debug!(callee = %hook.name, "OnStop hook executing");
        let began = Instant::now();
        match on_stop(ctx.clone()).await {
            Ok(()) => {
                debug!(callee = %hook.name, runtime = ?began.elapsed(), "OnStop hook executed")
            }
            Err(source) => {
                error!(callee = %hook.name, error = %source, "OnStop hook failed");
                errors.push(GraphError::Hook {
                    phase: "OnStop",
                    name: hook.name.clone(),
                    source,
                });
            }
        }
    }
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(GraphError::Lifecycle(errors)),
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("hooks", &self.len())
            .finish()
    }
}

/// Lets any value in the graph end the application's waiting phase.
#[derive(Clone, Debug)]
pub struct Shutdowner {
    tx: Arc<watch::Sender<Option<i32>>>,
}

impl Default for Shutdowner {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdowner {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Only the first request is kept.
    pub fn shutdown(&self, exit_code: i32) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(exit_code);
            true
        });
    }

    /// Resolves once shutdown was requested, immediately if it already was.
    pub async fn wait(&self) -> TerminationCause {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(exit_code) = *rx.borrow_and_update() {
                return TerminationCause::Shutdown { exit_code };
            }
            if rx.changed().await.is_err() {
                // Sender lives in self; unreachable while self is borrowed.
                futures::future::pending::<()>().await;
            }
        }
    }
}
