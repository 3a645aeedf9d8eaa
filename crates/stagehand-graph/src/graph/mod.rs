// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider graph.
//!
//! A [`Graph`] is assembled from [`GraphOption`]s. Every provider is
//! registered first; invokes then run in order and pull the values they
//! need into existence. Each constructor runs at most once and its result
//! is shared by every consumer.
//!
//! Two values are always available: the graph's [`Lifecycle`] and its
//! [`Shutdowner`].

mod provider;

pub use provider::{
    Args, GraphOption, Invoke, Key, Param, Provider, Value, downcast, invoke, module, options,
    provide, start_timeout, stop_timeout, supply, supply_named,
};
pub(crate) use provider::Arg;

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use stagehand::{Context, DEFAULT_TIMEOUT, TerminationCause, signals};
use tracing::{debug, error, info};

use crate::error::{GraphError, Result};
use crate::lifecycle::{Lifecycle, Shutdowner};

const BUILTIN_MODULE: &str = "stagehand-graph";

struct Registered {
    module: String,
    provider: Provider,
}

#[derive(Default)]
struct Collected {
    providers: Vec<Registered>,
    invokes: Vec<(String, Invoke)>,
    start_timeout: Option<Duration>,
    stop_timeout: Option<Duration>,
}

impl Collected {
    fn collect(&mut self, module: &str, opts: impl IntoIterator<Item = GraphOption>) {
        for opt in opts {
            match opt {
                GraphOption::Provide(provider) => self.providers.push(Registered {
                    module: module.to_string(),
                    provider,
                }),
                GraphOption::Invoke(invoke) => self.invokes.push((module.to_string(), invoke)),
                GraphOption::Module(name, nested) => self.collect(&name, nested),
                GraphOption::Options(nested) => self.collect(module, nested),
                GraphOption::StartTimeout(timeout) => self.start_timeout = Some(timeout),
                GraphOption::StopTimeout(timeout) => self.stop_timeout = Some(timeout),
            }
        }
    }
}

#[derive(Default)]
struct Container {
    providers: Vec<Registered>,
    index: HashMap<Key, Vec<usize>>,
    built: HashMap<usize, Vec<Value>>,
}

impl Container {
    fn register(&mut self, registered: Registered) -> Result<()> {
        let key = registered.provider.output.clone();
        let id = self.providers.len();
        let ids = self.index.entry(key.clone()).or_default();
        if !key.is_group()
            && let Some(&first) = ids.first()
        {
            return Err(GraphError::DuplicateProvider {
                key: key.to_string(),
                first: self.providers[first].provider.label.clone(),
                second: registered.provider.label,
            });
        }
        ids.push(id);
        debug!(
            constructor = %registered.provider.label,
            module = %registered.module,
            key = %key,
            "Provided"
        );
        self.providers.push(registered);
        Ok(())
    }

    fn args(&mut self, params: &[Param], required_by: &str, stack: &mut Vec<usize>) -> Result<Args> {
        let mut entries = Vec::with_capacity(params.len());
        for param in params {
            let arg = self.resolve(param, required_by, stack)?;
            entries.push((param.get_key().clone(), arg));
        }
        Ok(Args::new(entries))
    }

    fn resolve(&mut self, param: &Param, required_by: &str, stack: &mut Vec<usize>) -> Result<Arg> {
        let key = param.get_key();
        let ids = self.index.get(key).cloned().unwrap_or_default();

        if key.is_group() {
            let mut values = Vec::new();
            for id in ids {
                if param.is_soft() && !self.built.contains_key(&id) {
                    continue;
                }
                values.extend(self.build(id, stack)?);
            }
            return Ok(Arg::Many(values));
        }

        match ids.first() {
            Some(&id) => Ok(Arg::One(self.build(id, stack)?.into_iter().next())),
            None if param.is_optional() => Ok(Arg::One(None)),
            None => Err(GraphError::MissingDependency {
                key: key.to_string(),
                required_by: required_by.to_string(),
            }),
        }
    }

    fn build(&mut self, id: usize, stack: &mut Vec<usize>) -> Result<Vec<Value>> {
        if let Some(values) = self.built.get(&id) {
            return Ok(values.clone());
        }
        if let Some(pos) = stack.iter().position(|&s| s == id) {
            let mut path: Vec<&str> = stack[pos..]
                .iter()
                .map(|&s| self.providers[s].provider.label.as_str())
                .collect();
            path.push(&self.providers[id].provider.label);
            return Err(GraphError::Cycle {
                path: path.join(" -> "),
            });
        }

        let provider = self.providers[id].provider.clone();
        stack.push(id);
        let args = self.args(&provider.params, &provider.label, stack);
        stack.pop();

        let values = provider
            .construct(&args?)
            .map_err(|source| GraphError::Constructor {
                label: provider.label.clone(),
                source,
            })?;
        debug!(constructor = %provider.label, count = values.len(), "Constructed");
        self.built.insert(id, values.clone());
        Ok(values)
    }
}

/// Built provider graph with its own start/stop lifecycle.
pub struct Graph {
    container: Mutex<Container>,
    lifecycle: Lifecycle,
    shutdowner: Shutdowner,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl Graph {
    /// Register every provider and run every invoke.
    pub fn new(opts: impl IntoIterator<Item = GraphOption>) -> Result<Self> {
        let lifecycle = Lifecycle::default();
        let shutdowner = Shutdowner::new();

        let mut collected = Collected::default();
        collected.collect(
            BUILTIN_MODULE,
            [supply(lifecycle.clone()), supply(shutdowner.clone())],
        );
        collected.collect("", opts);

        let mut container = Container::default();
        for registered in collected.providers {
            container.register(registered)?;
        }

        for (module, invoke) in &collected.invokes {
            debug!(function = %invoke.label, module = %module, "Invoking");
            let mut stack = Vec::new();
            let args = container.args(&invoke.params, &invoke.label, &mut stack)?;
            invoke.call(&args).map_err(|source| {
                error!(function = %invoke.label, error = %source, "Invoke failed");
                GraphError::Invoke {
                    label: invoke.label.clone(),
                    source,
                }
            })?;
        }

        Ok(Self {
            container: Mutex::new(container),
            lifecycle,
            shutdowner,
            start_timeout: collected.start_timeout.unwrap_or(DEFAULT_TIMEOUT),
            stop_timeout: collected.stop_timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    fn container(&self) -> MutexGuard<'_, Container> {
        self.container
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve a single value, constructing it if needed. `Ok(None)` when
    /// nothing provides `key`. Group keys resolve to their first member.
    pub fn lookup(&self, key: &Key) -> Result<Option<Value>> {
        let param = if key.is_group() {
            Param::key(key.clone())
        } else {
            Param::key(key.clone()).optional()
        };
        match self.container().resolve(&param, "lookup", &mut Vec::new())? {
            Arg::One(value) => Ok(value),
            Arg::Many(values) => Ok(values.into_iter().next()),
        }
    }

    /// Every value of a group.
    pub fn group(&self, group: &str) -> Result<Vec<Value>> {
        match self
            .container()
            .resolve(&Param::group(group), "lookup", &mut Vec::new())?
        {
            Arg::Many(values) => Ok(values),
            Arg::One(value) => Ok(value.into_iter().collect()),
        }
    }

    /// Resolve a required value by type.
    pub fn get<T: Any + Clone>(&self) -> Result<T> {
        self.typed(&Key::of::<T>())
    }

    /// Resolve a required named value.
    pub fn get_named<T: Any + Clone>(&self, name: &str) -> Result<T> {
        self.typed(&Key::named(name))
    }

    fn typed<T: Any + Clone>(&self, key: &Key) -> Result<T> {
        let value = self
            .lookup(key)?
            .ok_or_else(|| GraphError::MissingDependency {
                key: key.to_string(),
                required_by: "lookup".to_string(),
            })?;
        downcast::<T>(&value).ok_or(GraphError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn shutdowner(&self) -> Shutdowner {
        self.shutdowner.clone()
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Run start hooks, bounded by the graph's start timeout and `ctx`.
    pub async fn start(&self, ctx: &Context) -> Result<()> {
        let ctx = ctx.with_timeout(self.start_timeout);
        let result = tokio::select! {
            result = self.lifecycle.start(&ctx) => result,
            err = ctx.done() => Err(GraphError::Timeout { phase: "start", source: err }),
        };
        match &result {
            Ok(()) => info!("Started"),
            Err(e) => error!(error = %e, "Start failed"),
        }
        result
    }

    /// Run stop hooks, bounded by the graph's stop timeout and `ctx`.
    pub async fn stop(&self, ctx: &Context) -> Result<()> {
        let ctx = ctx.with_timeout(self.stop_timeout);
        let result = tokio::select! {
            result = self.lifecycle.stop(&ctx) => result,
            err = ctx.done() => Err(GraphError::Timeout { phase: "stop", source: err }),
        };
        match &result {
            Ok(()) => info!("Stopped"),
            Err(e) => error!(error = %e, "Stop failed"),
        }
        result
    }

    /// Resolves on the first termination signal or shutdown request.
    pub async fn done(&self) -> TerminationCause {
        tokio::select! {
            signal = signals::wait_for_signal() => {
                info!(%signal, "Received signal");
                signal.into()
            }
            cause = self.shutdowner.wait() => cause,
        }
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("lifecycle", &self.lifecycle)
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_constructor_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let graph = Graph::new([
            provide(Provider::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(41u32)
            })),
            provide(
                Provider::new(|args| Ok(args.get::<u32>(0)? + 1))
                    .named("answer")
                    .param(Param::of::<u32>()),
            ),
            provide(
                Provider::new(|args| Ok(format!("{}", args.get::<u32>(0)?)))
                    .param(Param::of::<u32>()),
            ),
        ])
        .unwrap();

        assert_eq!(graph.get_named::<u32>("answer").unwrap(), 42);
        assert_eq!(graph.get::<String>().unwrap(), "41");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let err = Graph::new([supply(1u8), supply(2u8)]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateProvider { .. }));
    }

    #[test]
    fn test_cycle_detected() {
        let err = Graph::new([
            provide(
                Provider::new(|args| Ok(args.get::<u16>(0)? as u8))
                    .param(Param::of::<u16>())
                    .label("a"),
            ),
            provide(
                Provider::new(|args| Ok(args.get::<u8>(0)? as u16))
                    .param(Param::of::<u8>())
                    .label("b"),
            ),
            invoke(Invoke::new("use", |_| Ok(())).param(Param::of::<u8>())),
        ])
        .unwrap_err();
        match err {
            GraphError::Cycle { path } => assert_eq!(path, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtins_are_provided() {
        let graph = Graph::new([]).unwrap();
        assert!(graph.get::<Lifecycle>().is_ok());
        assert!(graph.get::<Shutdowner>().is_ok());
    }
}
