mod common;
mod queue_tests;
mod worker_tests;
