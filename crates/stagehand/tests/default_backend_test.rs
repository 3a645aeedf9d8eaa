// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the default backend.
//!
//! The default backend accepts only the marker config `()` and otherwise
//! runs nothing.
//!
//! Run with:
//! ```bash
//! cargo test -p stagehand --test default_backend_test
//! ```

use std::time::Duration;

use stagehand::{ConfigTree, ContextError, Error, Stagehand, options};

#[derive(Debug, Clone, Default, ConfigTree)]
struct ServiceConfig {
    name: String,
}

#[tokio::test]
async fn test_marker_config_starts_and_stops() {
    let app = Stagehand::new([]);
    app.start().await.unwrap();
    app.stop().await.unwrap();
}

#[tokio::test]
async fn test_non_marker_config_is_unsupported() {
    let app: Stagehand<ServiceConfig> = Stagehand::with_config([]);

    let err = app.start().await.unwrap_err();
    match err.root() {
        Error::UnsupportedConfigType { type_name } => {
            assert!(type_name.ends_with("ServiceConfig"), "got {type_name}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err, Error::BackendInit { .. }));
    assert!(err.to_string().starts_with("stagehand::DefaultBackend: unsupported config type"));
    assert!(!app.is_started());
}

#[tokio::test]
async fn test_start_with_cancelled_parent_context_fails() {
    let parent = stagehand::Context::background();
    parent.cancel();
    let app = Stagehand::new([options::context(parent)]);

    let err = app.start().await.unwrap_err();
    assert!(matches!(
        err,
        Error::BackendStart { ref source, .. } if matches!(**source, Error::Context(ContextError::Canceled))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_after_parent_deadline_fails() {
    let parent = stagehand::Context::background().with_timeout(Duration::from_millis(10));
    let app = Stagehand::new([options::context(parent)]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let err = app.start().await.unwrap_err();
    assert!(matches!(err.root(), Error::Context(ContextError::DeadlineExceeded)));
}
