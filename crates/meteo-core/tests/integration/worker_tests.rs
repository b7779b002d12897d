use std::sync::Arc;
use std::time::Duration;

use meteo_core::{
    ExtractionQueue, TaskStatus, TracingWorkerReporter, WorkerConfig, WorkerPool,
};
use tokio_util::sync::CancellationToken;

use crate::common::{SummaryFetcher, station_task};

fn config(workers: usize) -> WorkerConfig {
    WorkerConfig::default()
        .with_worker_id("it")
        .with_workers(workers)
        .with_poll_interval(Duration::from_millis(2))
        .with_stop_when_drained(true)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pool_extracts_every_station() {
    let queue: Arc<ExtractionQueue<String>> = Arc::new(ExtractionQueue::new());
    for i in 0..25 {
        queue.add_task(station_task(&format!("S{i}"))).unwrap();
    }
    let fetcher = SummaryFetcher::new();

    let processed = WorkerPool::new(Arc::clone(&queue), fetcher.clone(), config(3))
        .run(CancellationToken::new(), TracingWorkerReporter)
        .await
        .unwrap();

    assert_eq!(processed, 25);
    assert_eq!(fetcher.calls(), 25);
    let result = queue.get_task_result("S7-2024-03").unwrap();
    assert_eq!(result.as_str(), "S7: 2024-03-01..2024-03-31");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pool_retries_transient_failures() {
    let queue: Arc<ExtractionQueue<String>> = Arc::new(ExtractionQueue::new());
    for i in 0..12 {
        queue
            .add_task(station_task(&format!("S{i}")).with_max_retries(6))
            .unwrap();
    }
    // Every third call fails, so 12 successes take exactly 17 calls.
    let fetcher = SummaryFetcher::flaky(3);

    WorkerPool::new(Arc::clone(&queue), fetcher.clone(), config(2))
        .run(CancellationToken::new(), TracingWorkerReporter)
        .await
        .unwrap();

    let stats = queue.get_stats();
    assert_eq!(stats.completed, 12);
    assert_eq!(stats.failed, 0);
    assert_eq!(fetcher.calls(), 17);
    let retries: u32 = queue.get_all_tasks()[&TaskStatus::Completed]
        .iter()
        .map(|t| t.retry_count())
        .sum();
    assert_eq!(retries, 5);
}

#[tokio::test]
async fn pool_stops_on_cancellation() {
    let queue: Arc<ExtractionQueue<String>> = Arc::new(ExtractionQueue::new());
    let token = CancellationToken::new();
    let cfg = config(2).with_stop_when_drained(false);

    let handle = tokio::spawn(
        WorkerPool::new(Arc::clone(&queue), SummaryFetcher::new(), cfg)
            .run(token.clone(), TracingWorkerReporter),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let processed = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pool should stop after cancellation")
        .unwrap()
        .unwrap();
    assert_eq!(processed, 0);
}
