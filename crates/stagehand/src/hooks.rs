// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle hooks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::context::Context;
use crate::error::{BoxError, Error, Result};

/// Future returned by a hook.
pub type HookFuture = BoxFuture<'static, std::result::Result<(), BoxError>>;

/// Function run at a lifecycle phase boundary.
pub type Hook = Arc<dyn Fn(Context) -> HookFuture + Send + Sync>;

/// Wrap an async closure into a [`Hook`].
pub fn hook<F, Fut>(f: F) -> Hook
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Lifecycle phase a hook list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeStart,
    AfterStart,
    BeforeStop,
    AfterStop,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::BeforeStart => "before-start",
            HookPhase::AfterStart => "after-start",
            HookPhase::BeforeStop => "before-stop",
            HookPhase::AfterStop => "after-stop",
        };
        f.write_str(name)
    }
}

/// Run hooks in order, stopping at the first failure. `None` entries are skipped.
pub(crate) async fn run_hooks(ctx: &Context, phase: HookPhase, hooks: &[Option<Hook>]) -> Result<()> {
    for (index, hook) in hooks.iter().enumerate() {
        let Some(hook) = hook else {
            continue;
        };
        debug!(%phase, index, "Running lifecycle hook");
        hook(ctx.clone())
            .await
            .map_err(|source| Error::Hook {
                phase,
                index,
                source,
            })?;
    }
    Ok(())
}
