// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider-graph backend.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use stagehand::config::NAMED_CONFIG_POINTER_OUT;
use stagehand::{Backend, BackendInitParams, Context, Error, Result, TerminationCause, signals};
use tracing::{debug, info};

use crate::graph::{Graph, GraphOption, Key, start_timeout, stop_timeout};
use crate::lifecycle::Shutdowner;
use crate::modules::{app, config, logger};
use crate::registry;

/// Backend that runs the application as a provider graph.
///
/// Extra [`GraphOption`]s are passed through the controller's backend
/// options:
///
/// ```ignore
/// let app = Stagehand::new([
///     options::backend(GraphBackend::new()),
///     options::backend_options(vec![backend_option(supply(Database::default()))]),
/// ]);
/// ```
#[derive(Debug, Default)]
pub struct GraphBackend {
    graph: RwLock<Option<Arc<Graph>>>,
}

impl GraphBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph built by the last successful `init`.
    pub fn graph(&self) -> Option<Arc<Graph>> {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Shutdowner of the current graph.
    pub fn shutdowner(&self) -> Option<Shutdowner> {
        self.graph().map(|graph| graph.shutdowner())
    }

    fn require_graph(&self) -> Result<Arc<Graph>> {
        self.graph()
            .ok_or_else(|| Error::backend("graph backend used before init"))
    }
}

#[async_trait]
impl Backend for GraphBackend {
    fn name(&self) -> &str {
        "stagehand_graph::GraphBackend"
    }

    async fn init(&self, mut params: BackendInitParams<'_>) -> Result<()> {
        let mut opts = vec![app::provide_app(params.app.clone()), logger::module()];

        let config = if params.config.is::<()>() {
            None
        } else {
            params.config.handle()
        };
        if let Some(handle) = &config {
            debug!(config = handle.type_name(), "Supplying config");
            opts.push(config::module());
            opts.push(config::supply_config_pointer(handle.clone()));
        }

        opts.push(registry::provide_registered());
        opts.extend(
            params
                .options
                .iter()
                .filter_map(|opt| opt.downcast_ref::<GraphOption>())
                .cloned(),
        );
        opts.push(start_timeout(params.start_timeout));
        opts.push(stop_timeout(params.stop_timeout));

        let graph = Graph::new(opts).map_err(Error::backend)?;

        if params.logger.is_empty() {
            let key = Key::from_type_id(params.logger.type_id(), params.logger.type_name());
            if let Some(value) = graph.lookup(&key).map_err(Error::backend)? {
                let found = params.logger.type_name();
                params.logger.set_erased(&*value, found)?;
            }
        }

        if config.is_some()
            && let Some(out) = graph
                .lookup(&Key::named(NAMED_CONFIG_POINTER_OUT))
                .map_err(Error::backend)?
            && let Some(handle) = config::config_node(&out)
        {
            params.config.set_handle(&handle)?;
        }

        *self.graph.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(graph));
        info!("Graph backend initialized");
        Ok(())
    }

    async fn start(&self, ctx: Context) -> Result<()> {
        self.require_graph()?
            .start(&ctx)
            .await
            .map_err(Error::backend)
    }

    async fn stop(&self, ctx: Context) -> Result<()> {
        self.require_graph()?
            .stop(&ctx)
            .await
            .map_err(Error::backend)
    }

    async fn wait(&self) -> TerminationCause {
        match self.graph() {
            Some(graph) => graph.done().await,
            None => signals::wait_for_signal().await.into(),
        }
    }
}
