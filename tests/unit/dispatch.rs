use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use batchwise::prelude::*;
use batchwise::test_util::{
    data_source, init_tracing, query, FailingExecutor, RecordingExecutor, StaticExecutor,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::test;

fn dispatcher_with(
    executors: Vec<(&str, Arc<dyn QueryExecutor>)>,
    config: DispatchConfig,
) -> Result<Dispatcher> {
    let registry = ExecutorRegistry::new();
    for (plugin_id, executor) in executors {
        registry.register(plugin_id, executor);
    }
    Ok(Dispatcher::new(Arc::new(registry), config)?)
}

#[test]
async fn test_independent_batches_each_publish_once() -> Result<()> {
    init_tracing();
    let registry = ExecutorRegistry::new();
    registry.register("testdata", Arc::new(StaticExecutor::with_delay(Duration::from_millis(10))));
    let registry = Arc::new(registry);

    let queries = (0..8)
        .map(|i| query(&format!("Q{i}"), &data_source(i, "testdata"), &[]))
        .collect();
    let batches = get_batches(&Request::new(queries));
    let (context, mut rx) = QueryContext::new(TimeRange::default(), batches.len());
    let context = Arc::new(context);

    let mut handles = Vec::new();
    for mut batch in batches {
        let context = context.clone();
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            batch.process(registry.as_ref(), &context).await?;
            Ok::<_, DispatchError>(batch)
        }));
    }
    for handle in futures::future::join_all(handles).await {
        assert_eq!(handle??.state(), BatchState::Done);
    }

    let mut seen = HashSet::new();
    while let Ok(result) = rx.try_recv() {
        assert_eq!(result.len(), 1);
        seen.extend(result.query_results.into_keys());
    }
    assert_eq!(seen.len(), 8);
    Ok(())
}

#[test]
async fn test_independent_batches_run_in_parallel() -> Result<()> {
    let recorder = RecordingExecutor::with_delay(Duration::from_millis(50));
    let dispatcher = dispatcher_with(
        vec![("testdata", recorder.clone() as Arc<dyn QueryExecutor>)],
        DispatchConfig::default(),
    )?;
    let queries = (0..5)
        .map(|i| query(&format!("Q{i}"), &data_source(i, "testdata"), &[]))
        .collect();

    let response = dispatcher.handle_request(Request::new(queries)).await?;

    assert_eq!(response.results.len(), 5);
    assert_eq!(response.batch_timings.len(), 5);
    assert!(recorder.max_in_flight() > 1);
    Ok(())
}

#[test]
async fn test_concurrency_cap_is_respected() -> Result<()> {
    let recorder = RecordingExecutor::with_delay(Duration::from_millis(20));
    let dispatcher = dispatcher_with(
        vec![("testdata", recorder.clone() as Arc<dyn QueryExecutor>)],
        DispatchConfig::default().with_max_concurrent_batches(2),
    )?;
    let queries = (0..6)
        .map(|i| query(&format!("Q{i}"), &data_source(i, "testdata"), &[]))
        .collect();

    let response = dispatcher.handle_request(Request::new(queries)).await?;

    assert_eq!(response.results.len(), 6);
    assert!(recorder.max_in_flight() <= 2);
    Ok(())
}

#[test]
async fn test_dependents_see_their_dependencies() -> Result<()> {
    init_tracing();
    let recorder = RecordingExecutor::with_delay(Duration::from_millis(10));
    let dispatcher = dispatcher_with(
        vec![("testdata", recorder.clone() as Arc<dyn QueryExecutor>)],
        DispatchConfig::default(),
    )?;
    let request = Request::new(vec![
        query("A", &data_source(1, "testdata"), &[]),
        query("X", &data_source(4, "testdata"), &[]),
        query("B", &data_source(2, "testdata"), &["A"]),
        query("C", &data_source(3, "testdata"), &["A", "B"]),
    ]);

    let response = dispatcher.handle_request(request).await?;

    assert_eq!(response.results.len(), 4);
    let b = recorder.record_for("B").await.expect("B executed");
    assert!(b.visible.contains("A"));
    let c = recorder.record_for("C").await.expect("C executed");
    assert!(c.visible.contains("A") && c.visible.contains("B"));
    Ok(())
}

#[test]
async fn test_results_keep_the_executor_payload() -> Result<()> {
    let dispatcher = dispatcher_with(
        vec![("testdata", Arc::new(StaticExecutor::new()) as Arc<dyn QueryExecutor>)],
        DispatchConfig::default(),
    )?;
    let ds = data_source(1, "testdata");
    let request = Request::new(vec![
        query("A", &ds, &[]).with_model(json!({ "scenario": "random_walk" })),
        query("B", &ds, &[]),
    ]);

    let response = dispatcher.handle_request(request).await?;

    assert_eq!(
        response.result("A").and_then(QueryResult::value),
        Some(&json!({ "refId": "A", "model": { "scenario": "random_walk" } }))
    );
    assert_eq!(response.batch_timings.len(), 1);
    assert_eq!(response.batch_timings[0].ref_ids, vec!["A".to_string(), "B".to_string()]);
    Ok(())
}

#[test]
async fn test_failed_dependency_still_releases_dependents() -> Result<()> {
    let recorder = RecordingExecutor::new();
    let dispatcher = dispatcher_with(
        vec![
            ("broken", Arc::new(FailingExecutor::new("connection refused")) as Arc<dyn QueryExecutor>),
            ("testdata", recorder.clone() as Arc<dyn QueryExecutor>),
        ],
        DispatchConfig::default(),
    )?;
    let request = Request::new(vec![
        query("A", &data_source(1, "broken"), &[]),
        query("B", &data_source(2, "testdata"), &["A"]),
    ]);

    let response = dispatcher.handle_request(request).await?;

    assert_eq!(
        response.result("A").and_then(QueryResult::error),
        Some(&QueryError::execution("connection refused"))
    );
    assert!(response.result("B").and_then(QueryResult::value).is_some());
    assert!(recorder.record_for("B").await.is_some());
    Ok(())
}

#[test]
async fn test_missing_executor_marks_every_query() -> Result<()> {
    let dispatcher = dispatcher_with(vec![], DispatchConfig::default())?;
    let ds = data_source(9, "mystery");
    let request = Request::new(vec![query("A", &ds, &[]), query("B", &ds, &[])]);

    let response = dispatcher.handle_request(request).await?;

    let expected = QueryError::ExecutorNotFound {
        plugin_id: "mystery".into(),
    };
    assert_eq!(response.result("A").and_then(QueryResult::error), Some(&expected));
    assert_eq!(response.result("B").and_then(QueryResult::error), Some(&expected));
    assert_eq!(
        expected.to_string(),
        "Could not find executor for data source type: mystery"
    );
    Ok(())
}

struct PanickingExecutor;

#[async_trait]
impl QueryExecutor for PanickingExecutor {
    async fn execute(&self, _queries: &[Query], _context: &QueryContext) -> BatchResult {
        panic!("plugin bug")
    }
}

#[test]
async fn test_panicking_executor_does_not_sink_siblings() -> Result<()> {
    let dispatcher = dispatcher_with(
        vec![
            ("buggy", Arc::new(PanickingExecutor) as Arc<dyn QueryExecutor>),
            ("testdata", Arc::new(StaticExecutor::new()) as Arc<dyn QueryExecutor>),
        ],
        DispatchConfig::default(),
    )?;
    let request = Request::new(vec![
        query("A", &data_source(1, "buggy"), &[]),
        query("B", &data_source(2, "testdata"), &[]),
        query("C", &data_source(3, "testdata"), &["A"]),
    ]);

    let response = dispatcher.handle_request(request).await?;

    assert_eq!(
        response.result("A").and_then(QueryResult::error),
        Some(&QueryError::execution("executor panicked: plugin bug"))
    );
    assert!(response.result("B").and_then(QueryResult::value).is_some());
    assert!(response.result("C").and_then(QueryResult::value).is_some());
    assert_eq!(response.batch_timings.len(), 3);
    Ok(())
}
