// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the provider graph.
//!
//! These tests verify:
//! 1. Values resolve by type, by name and by group, each constructed once
//! 2. Optional params resolve to nothing and soft groups skip unbuilt values
//! 3. Invokes run in registration order and their failures abort the build
//! 4. Lifecycle hooks appended by constructors run on start and stop
//! 5. Start and stop are bounded by the graph timeouts
//! 6. `done` resolves on an explicit shutdown request
//!
//! Run with:
//! ```bash
//! cargo test -p stagehand-graph --test graph_test
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagehand::{BoxError, Context, TerminationCause, hook, tags};
use stagehand_graph::{
    Graph, GraphError, Invoke, Key, Lifecycle, LifecycleHook, Param, Provider, Shutdowner,
    invoke, module, provide, start_timeout, stop_timeout, supply, supply_named,
};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone, PartialEq)]
struct Database {
    dsn: String,
}

#[derive(Debug, Clone)]
struct Route(&'static str);

#[test]
fn test_resolves_by_type_name_and_group() -> anyhow::Result<()> {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let graph = Graph::new([
        supply_named("db.dsn", "postgres://localhost".to_string()),
        provide(
            Provider::new(move |args| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Database {
                    dsn: args.get::<String>(0)?,
                })
            })
            .param(Param::named("db.dsn")),
        ),
        provide(Provider::supply(Route("/health")).group("routes")),
        provide(Provider::many("routes", |_| Ok(vec![Route("/a"), Route("/b")]))),
        provide(
            Provider::new(|args| {
                let db = args.get::<Database>(0)?;
                let routes = args.group::<Route>(1);
                Ok(format!("{} {}", db.dsn, routes.len()))
            })
            .named("summary")
            .param(Param::of::<Database>())
            .param(Param::tag(&tags::group("routes"))?),
        ),
    ])?;

    assert_eq!(
        graph.get_named::<String>("summary")?,
        "postgres://localhost 3"
    );
    assert_eq!(graph.get::<Database>()?.dsn, "postgres://localhost");
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let routes: Vec<&'static str> = graph
        .group("routes")?
        .iter()
        .filter_map(stagehand_graph::graph::downcast::<Route>)
        .map(|r| r.0)
        .collect();
    assert_eq!(routes, vec!["/health", "/a", "/b"]);
    Ok(())
}

#[test]
fn test_missing_dependency_names_consumer() {
    let err = Graph::new([invoke(
        Invoke::new("needs-db", |_| Ok(())).param(Param::of::<Database>()),
    )])
    .unwrap_err();

    match err {
        GraphError::MissingDependency { key, required_by } => {
            assert!(key.ends_with("Database"));
            assert_eq!(required_by, "needs-db");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_optional_param_resolves_to_none() {
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    Graph::new([invoke(
        Invoke::new("optional", move |args| {
            *slot.lock().unwrap() = Some(args.optional::<Database>(0).is_none());
            Ok(())
        })
        .param(Param::tag(&tags::named_optional("db")).unwrap()),
    )])
    .unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(true));
}

#[test]
fn test_soft_group_skips_unbuilt_values() {
    let counts = Arc::new(Mutex::new(Vec::new()));
    let (soft, hard) = (counts.clone(), counts.clone());

    Graph::new([
        provide(Provider::supply(Route("/a")).group("routes")),
        provide(Provider::supply(Route("/b")).group("routes")),
        provide(
            Provider::new(|args| Ok(args.group::<Route>(0).len()))
                .named("eager-count")
                .param(Param::group("routes")),
        ),
        invoke(
            Invoke::new("soft", move |args| {
                soft.lock().unwrap().push(args.values(0).len());
                Ok(())
            })
            .param(Param::group("routes").soft()),
        ),
        invoke(
            Invoke::new("hard", move |args| {
                hard.lock().unwrap().push(args.get::<usize>(0)?);
                Ok(())
            })
            .param(Param::named("eager-count")),
        ),
        invoke(
            Invoke::new("soft-again", {
                let counts = counts.clone();
                move |args| {
                    counts.lock().unwrap().push(args.values(0).len());
                    Ok(())
                }
            })
            .param(Param::group("routes").soft()),
        ),
    ])
    .unwrap();

    // Nothing is built before the first soft read; the hard read builds both.
    assert_eq!(*counts.lock().unwrap(), vec![0, 2, 2]);
}

#[test]
fn test_invokes_run_in_order_and_failure_aborts() {
    let log: Log = Arc::default();
    let (first, second, third) = (log.clone(), log.clone(), log.clone());

    let err = Graph::new([
        invoke(Invoke::new("first", move |_| {
            record(&first, "first");
            Ok(())
        })),
        module(
            "nested",
            vec![invoke(Invoke::new("second", move |_| {
                record(&second, "second");
                Err::<(), BoxError>("refused".into())
            }))],
        ),
        invoke(Invoke::new("third", move |_| {
            record(&third, "third");
            Ok(())
        })),
    ])
    .unwrap_err();

    assert_eq!(err.to_string(), "invoke second failed: refused");
    assert_eq!(events(&log), vec!["first", "second"]);
}

#[test]
fn test_constructor_error_is_wrapped() {
    let err = Graph::new([
        provide(Provider::new(|_| Err::<Database, BoxError>("no network".into())).label("dial")),
        invoke(Invoke::new("use", |_| Ok(())).param(Param::of::<Database>())),
    ])
    .unwrap_err();
    assert_eq!(err.to_string(), "constructor dial failed: no network");
}

#[test]
fn test_lookup_unknown_key_is_none() {
    let graph = Graph::new([]).unwrap();
    assert!(graph.lookup(&Key::named("nothing")).unwrap().is_none());
    assert!(graph.group("nothing").unwrap().is_empty());
}

fn server(log: &Log) -> Provider {
    let log = log.clone();
    Provider::new(move |args| {
        let lifecycle = args.get::<Lifecycle>(0)?;
        let (start_log, stop_log) = (log.clone(), log.clone());
        lifecycle.append(
            LifecycleHook::new("server")
                .on_start(hook(move |_| {
                    let log = start_log.clone();
                    async move {
                        record(&log, "server start");
                        Ok::<(), BoxError>(())
                    }
                }))
                .on_stop(hook(move |_| {
                    let log = stop_log.clone();
                    async move {
                        record(&log, "server stop");
                        Ok::<(), BoxError>(())
                    }
                })),
        );
        Ok(Route("server"))
    })
    .param(Param::of::<Lifecycle>())
}

#[tokio::test]
async fn test_lifecycle_hooks_follow_construction_order() {
    let log: Log = Arc::default();
    let worker_log = log.clone();

    let graph = Graph::new([
        provide(server(&log)),
        invoke(
            Invoke::new("worker", move |args| {
                let _server = args.get::<Route>(0)?;
                let lifecycle = args.get::<Lifecycle>(1)?;
                let (start_log, stop_log) = (worker_log.clone(), worker_log.clone());
                lifecycle.append(
                    LifecycleHook::new("worker")
                        .on_start(hook(move |_| {
                            let log = start_log.clone();
                            async move {
                                record(&log, "worker start");
                                Ok::<(), BoxError>(())
                            }
                        }))
                        .on_stop(hook(move |_| {
                            let log = stop_log.clone();
                            async move {
                                record(&log, "worker stop");
                                Ok::<(), BoxError>(())
                            }
                        })),
                );
                Ok(())
            })
            .param(Param::of::<Route>())
            .param(Param::of::<Lifecycle>()),
        ),
    ])
    .unwrap();

    let ctx = Context::background();
    graph.start(&ctx).await.unwrap();
    graph.stop(&ctx).await.unwrap();

    assert_eq!(
        events(&log),
        vec!["server start", "worker start", "worker stop", "server stop"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_timeout() {
    let graph = Graph::new([
        start_timeout(Duration::from_secs(1)),
        stop_timeout(Duration::from_secs(3)),
        invoke(
            Invoke::new("slow", |args| {
                args.get::<Lifecycle>(0)?.append(LifecycleHook::new("slow").on_start(hook(
                    |_| async {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        Ok::<(), BoxError>(())
                    },
                )));
                Ok(())
            })
            .param(Param::of::<Lifecycle>()),
        ),
    ])
    .unwrap();

    assert_eq!(graph.start_timeout(), Duration::from_secs(1));
    assert_eq!(graph.stop_timeout(), Duration::from_secs(3));

    let err = graph.start(&Context::background()).await.unwrap_err();
    assert_eq!(err.to_string(), "start timed out: context deadline exceeded");
}

#[tokio::test]
async fn test_unbounded_timeouts() {
    let log = Log::default();
    let (start_log, stop_log) = (log.clone(), log.clone());
    let graph = Graph::new([
        start_timeout(Duration::MAX),
        stop_timeout(Duration::MAX),
        invoke(
            Invoke::new("server", move |args| {
                let (start_log, stop_log) = (start_log.clone(), stop_log.clone());
                args.get::<Lifecycle>(0)?.append(
                    LifecycleHook::new("server")
                        .on_start(hook(move |_| {
                            let log = start_log.clone();
                            async move {
                                record(&log, "start");
                                Ok::<(), BoxError>(())
                            }
                        }))
                        .on_stop(hook(move |_| {
                            let log = stop_log.clone();
                            async move {
                                record(&log, "stop");
                                Ok::<(), BoxError>(())
                            }
                        })),
                );
                Ok(())
            })
            .param(Param::of::<Lifecycle>()),
        ),
    ])
    .unwrap();

    let ctx = Context::background();
    graph.start(&ctx).await.unwrap();
    graph.stop(&ctx).await.unwrap();
    assert_eq!(events(&log), vec!["start", "stop"]);
}

#[tokio::test]
async fn test_stop_honours_cancelled_context() {
    let graph = Graph::new([invoke(
        Invoke::new("stuck", |args| {
            args.get::<Lifecycle>(0)?.append(LifecycleHook::new("stuck").on_stop(hook(
                |_| async {
                    std::future::pending::<()>().await;
                    Ok::<(), BoxError>(())
                },
            )));
            Ok(())
        })
        .param(Param::of::<Lifecycle>()),
    )])
    .unwrap();

    let ctx = Context::background();
    graph.start(&ctx).await.unwrap();
    ctx.cancel();
    assert!(matches!(
        graph.stop(&ctx).await,
        Err(GraphError::Timeout { phase: "stop", .. })
    ));
}

#[tokio::test]
async fn test_done_resolves_on_shutdown() {
    let graph = Graph::new([invoke(
        Invoke::new("exit", |args| {
            args.get::<Shutdowner>(0)?.shutdown(7);
            Ok(())
        })
        .param(Param::of::<Shutdowner>()),
    )])
    .unwrap();

    assert_eq!(graph.done().await, TerminationCause::Shutdown { exit_code: 7 });
}

#[test]
fn test_duplicate_names_are_rejected() {
    let err = Graph::new([supply_named("x", 1u8), supply_named("x", 2u16)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"name:"x" already provided by u8, cannot provide it again from u16"#
    );
}

#[test]
fn test_groups_accept_many_providers() {
    let graph = Graph::new([
        provide(Provider::supply(1u8).group("g")),
        provide(Provider::supply(2u8).group("g")),
        supply(3u8),
    ])
    .unwrap();
    assert_eq!(graph.group("g").unwrap().len(), 2);
    assert_eq!(graph.get::<u8>().unwrap(), 3);
}
