// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! No-op backend.

use async_trait::async_trait;
use tracing::debug;

use super::{Backend, BackendInitParams};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::signals::{self, TerminationCause};

/// Backend that runs nothing and terminates on SIGINT/SIGTERM.
///
/// Only the marker configuration `()` is accepted; anything else needs a
/// backend that knows how to load it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackend;

#[async_trait]
impl Backend for DefaultBackend {
    fn name(&self) -> &str {
        "stagehand::DefaultBackend"
    }

    async fn init(&self, params: BackendInitParams<'_>) -> Result<()> {
        if !params.config.is_empty() && !params.config.is::<()>() {
            return Err(Error::UnsupportedConfigType {
                type_name: params.config.type_name().to_string(),
            });
        }
        debug!(app = ?params.app, "Default backend initialized");
        Ok(())
    }

    async fn start(&self, ctx: Context) -> Result<()> {
        Ok(ctx.check()?)
    }

    async fn stop(&self, ctx: Context) -> Result<()> {
        Ok(ctx.check()?)
    }

    async fn wait(&self) -> TerminationCause {
        signals::wait_for_signal().await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_reports_cancelled_context() {
        let ctx = Context::background();
        assert!(DefaultBackend.start(ctx.clone()).await.is_ok());
        ctx.cancel();
        assert!(matches!(
            DefaultBackend.start(ctx.clone()).await,
            Err(Error::Context(crate::context::ContextError::Canceled))
        ));
        assert!(DefaultBackend.stop(ctx).await.is_err());
    }
}
