use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use batchwise::prelude::*;
use batchwise::test_util::{data_source, query, PendingExecutor, RecordingExecutor};
use pretty_assertions::assert_eq;
use tokio::test;
use tokio_util::sync::CancellationToken;

fn registry(recorder: Arc<RecordingExecutor>) -> Arc<ExecutorRegistry> {
    let registry = ExecutorRegistry::new();
    registry.register("stuck", Arc::new(PendingExecutor));
    registry.register("testdata", recorder);
    Arc::new(registry)
}

fn stuck_chain() -> Request {
    Request::new(vec![
        query("A", &data_source(1, "stuck"), &[]),
        query("B", &data_source(2, "testdata"), &["A"]),
    ])
}

#[test]
async fn test_request_timeout_abandons_waiting_batches() -> Result<()> {
    let recorder = RecordingExecutor::new();
    let config = DispatchConfig::default().with_request_timeout(Some(Duration::from_millis(50)));
    let dispatcher = Dispatcher::new(registry(recorder.clone()), config)?;

    let outcome = dispatcher.handle_request(stuck_chain()).await;

    assert_eq!(
        outcome.err(),
        Some(DispatchError::Timeout(Duration::from_millis(50)))
    );
    assert!(recorder.records().await.is_empty());
    Ok(())
}

#[test]
async fn test_cancellation_stops_the_request() -> Result<()> {
    let recorder = RecordingExecutor::new();
    let config = DispatchConfig::default().with_request_timeout(None);
    let dispatcher = Dispatcher::new(registry(recorder.clone()), config)?;
    let cancel = CancellationToken::new();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        })
    };
    let outcome = dispatcher
        .handle_request_with_cancel(stuck_chain(), cancel)
        .await;
    trigger.await?;

    assert_eq!(outcome.err(), Some(DispatchError::Cancelled));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(recorder.record_for("B").await.is_none());
    Ok(())
}
