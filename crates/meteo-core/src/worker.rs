use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::error::AppError;
use crate::extraction_queue::ExtractionQueue;
use crate::task::ExtractionTask;
use crate::traits::Fetcher;

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: &'a str,
    },
    Polling,
    TaskStarted {
        task_id: &'a str,
        station_id: &'a str,
        attempt: u32,
    },
    TaskCompleted {
        task_id: &'a str,
    },
    TaskFailed {
        task_id: &'a str,
        error: &'a str,
        will_retry: bool,
    },
    Drained {
        worker_id: &'a str,
    },
    Stopped {
        worker_id: &'a str,
        tasks_processed: u64,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::Polling => {
                tracing::debug!("Polling for tasks");
            }
            WorkerEvent::TaskStarted {
                task_id,
                station_id,
                attempt,
            } => {
                tracing::info!(%task_id, %station_id, attempt, "Fetching observations");
            }
            WorkerEvent::TaskCompleted { task_id } => {
                tracing::info!(%task_id, "Extraction completed");
            }
            WorkerEvent::TaskFailed {
                task_id,
                error,
                will_retry,
            } => {
                tracing::warn!(%task_id, %error, %will_retry, "Extraction failed");
            }
            WorkerEvent::Drained { worker_id } => {
                tracing::info!(%worker_id, "Queue drained");
            }
            WorkerEvent::Stopped {
                worker_id,
                tasks_processed,
            } => {
                tracing::info!(%worker_id, tasks_processed, "Worker stopped");
            }
        }
    }
}

/// Worker that polls the extraction queue and runs each task through a fetcher.
pub struct WorkerService<F: Fetcher> {
    queue: Arc<ExtractionQueue<F::Output>>,
    fetcher: F,
    config: WorkerConfig,
}

impl<F: Fetcher> WorkerService<F> {
    pub fn new(queue: Arc<ExtractionQueue<F::Output>>, fetcher: F, config: WorkerConfig) -> Self {
        Self {
            queue,
            fetcher,
            config,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Run the worker loop until cancellation, or until the queue is drained
    /// when `stop_when_drained` is set. Returns the number of tasks processed.
    ///
    /// A fetch already in flight is allowed to finish before the loop exits.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &WR,
    ) -> Result<u64, AppError> {
        reporter.report(WorkerEvent::Started {
            worker_id: &self.config.worker_id,
        });

        let mut processed = 0;
        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            reporter.report(WorkerEvent::Polling);

            match self.queue.get_next_task() {
                Some(task) => {
                    self.process_task(&task, reporter).await;
                    processed += 1;
                }
                None => {
                    if self.config.stop_when_drained && self.queue.get_stats().is_drained() {
                        reporter.report(WorkerEvent::Drained {
                            worker_id: &self.config.worker_id,
                        });
                        break;
                    }
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
            }
        }

        reporter.report(WorkerEvent::Stopped {
            worker_id: &self.config.worker_id,
            tasks_processed: processed,
        });

        Ok(processed)
    }

    async fn process_task<WR: WorkerReporter>(
        &self,
        task: &ExtractionTask<F::Output>,
        reporter: &WR,
    ) {
        reporter.report(WorkerEvent::TaskStarted {
            task_id: &task.task_id,
            station_id: &task.station_id,
            attempt: task.retry_count() + 1,
        });

        let fetched = self
            .fetcher
            .fetch(&task.station_id, task.start_date, task.end_date)
            .await;

        match fetched {
            Ok(output) => match self.queue.complete_task(&task.task_id, output) {
                Ok(()) => reporter.report(WorkerEvent::TaskCompleted {
                    task_id: &task.task_id,
                }),
                Err(e) => {
                    tracing::error!(
                        task_id = %task.task_id,
                        error = %e,
                        "Failed to mark task completed"
                    );
                }
            },
            Err(e) => {
                let error_msg = e.to_string();
                match self
                    .queue
                    .fail_task(&task.task_id, error_msg.as_str(), e.is_retryable())
                {
                    Ok(will_retry) => reporter.report(WorkerEvent::TaskFailed {
                        task_id: &task.task_id,
                        error: &error_msg,
                        will_retry,
                    }),
                    Err(qe) => {
                        tracing::error!(
                            task_id = %task.task_id,
                            error = %qe,
                            "Failed to mark task as failed"
                        );
                    }
                }
            }
        }
    }
}

/// Spawns `config.workers` workers sharing one queue and fetcher.
pub struct WorkerPool<F: Fetcher> {
    queue: Arc<ExtractionQueue<F::Output>>,
    fetcher: F,
    config: WorkerConfig,
}

impl<F: Fetcher + 'static> WorkerPool<F> {
    pub fn new(queue: Arc<ExtractionQueue<F::Output>>, fetcher: F, config: WorkerConfig) -> Self {
        Self {
            queue,
            fetcher,
            config,
        }
    }

    /// Run every worker to completion. Worker ids are `<worker_id>-<n>`.
    ///
    /// Returns the total number of tasks processed across workers.
    pub async fn run<WR>(
        self,
        cancel_token: CancellationToken,
        reporter: WR,
    ) -> Result<u64, AppError>
    where
        WR: WorkerReporter + Clone + 'static,
    {
        self.config.validate()?;

        let mut workers = JoinSet::new();
        for n in 0..self.config.workers {
            let config = self
                .config
                .clone()
                .with_worker_id(format!("{}-{n}", self.config.worker_id));
            let worker = WorkerService::new(Arc::clone(&self.queue), self.fetcher.clone(), config);
            let token = cancel_token.child_token();
            let reporter = reporter.clone();
            workers.spawn(async move { worker.run(token, &reporter).await });
        }

        let mut processed = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(n)) => processed += n,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Worker exited with error");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Worker task aborted");
                    return Err(AppError::Generic(format!("worker task aborted: {e}")));
                }
            }
        }
        Ok(processed)
    }
}
