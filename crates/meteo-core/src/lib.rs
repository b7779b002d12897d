pub mod config;
pub mod error;
pub mod extraction_queue;
pub mod fifo;
pub mod models;
pub mod orchestrator;
pub mod priority;
pub mod task;
pub mod traits;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::WorkerConfig;
pub use error::AppError;
pub use extraction_queue::ExtractionQueue;
pub use fifo::FifoQueue;
pub use models::{Dataset, Observation};
pub use orchestrator::{Orchestrator, QueueStats};
pub use priority::PriorityQueue;
pub use task::{ExtractionTask, TaskPriority, TaskStatus, TaskSummary};
pub use traits::Fetcher;
pub use worker::{TracingWorkerReporter, WorkerEvent, WorkerPool, WorkerReporter, WorkerService};
