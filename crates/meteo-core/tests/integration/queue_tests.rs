use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use meteo_core::{AppError, Dataset, ExtractionQueue, TaskPriority, TaskStatus};

use crate::common::station_task;

fn ids(queue: &ExtractionQueue, status: TaskStatus) -> Vec<String> {
    queue.get_all_tasks()[&status]
        .iter()
        .map(|t| t.task_id.clone())
        .collect()
}

#[test]
fn high_priority_station_is_served_first_and_retried() {
    let queue: ExtractionQueue = ExtractionQueue::new();
    queue.add_task(station_task("A")).unwrap();
    queue
        .add_task(station_task("B").with_priority(TaskPriority::High))
        .unwrap();
    queue.add_task(station_task("C")).unwrap();

    let b = queue.get_next_task().unwrap();
    assert_eq!(b.station_id, "B");
    assert!(queue.fail_task(&b.task_id, "Connection timeout", true).unwrap());

    let retried = queue.get_task(&b.task_id).unwrap();
    assert_eq!(retried.status(), TaskStatus::Pending);
    assert_eq!(retried.retry_count(), 1);

    let order: Vec<String> = std::iter::from_fn(|| queue.get_next_task())
        .map(|t| t.station_id)
        .collect();
    assert_eq!(order, vec!["B", "A", "C"]);
}

#[test]
fn full_lifecycle_keeps_counters_consistent() {
    let queue: ExtractionQueue = ExtractionQueue::new();
    for station in ["PARIS", "LYON", "NICE", "BREST"] {
        queue.add_task(station_task(station)).unwrap();
    }
    assert!(matches!(
        queue.add_task(station_task("PARIS")),
        Err(AppError::DuplicateTaskId(_))
    ));

    queue.cancel_task("BREST-2024-03").unwrap();
    let paris = queue.get_next_task().unwrap();
    let lyon = queue.get_next_task().unwrap();
    let nice = queue.get_next_task().unwrap();
    assert!(queue.get_next_task().is_none());

    queue
        .complete_task(&paris.task_id, Dataset::new("PARIS"))
        .unwrap();
    queue.fail_task(&lyon.task_id, "no such station", false).unwrap();

    let stats = queue.get_stats();
    assert_eq!(
        (stats.pending, stats.processing, stats.completed, stats.failed, stats.cancelled),
        (0, 1, 1, 1, 1)
    );
    assert_eq!(stats.total, 4);
    assert!(!stats.is_drained());

    assert_eq!(ids(&queue, TaskStatus::Processing), vec![nice.task_id.clone()]);
    assert_eq!(ids(&queue, TaskStatus::Cancelled), vec!["BREST-2024-03"]);
    assert!(ids(&queue, TaskStatus::Pending).is_empty());

    queue.complete_task(&nice.task_id, Dataset::new("NICE")).unwrap();
    assert!(queue.get_stats().is_drained());
}

#[test]
fn rejected_operations_leave_state_untouched() {
    let queue: ExtractionQueue = ExtractionQueue::new();
    queue.add_task(station_task("PARIS")).unwrap();
    let before = queue.get_stats();

    assert!(queue.complete_task("PARIS-2024-03", Dataset::default()).is_err());
    assert!(queue.fail_task("PARIS-2024-03", "early", true).is_err());
    assert!(queue.complete_task("missing", Dataset::default()).is_err());

    assert_eq!(queue.get_stats(), before);
    assert_eq!(queue.get_task_status("PARIS-2024-03"), Some(TaskStatus::Pending));
    assert!(queue.get_task_result("PARIS-2024-03").is_none());
}

#[test]
fn custom_result_type() {
    let queue: ExtractionQueue<Vec<f64>> = ExtractionQueue::new();
    queue.add_task(station_task("PARIS")).unwrap();
    let task = queue.get_next_task().unwrap();
    queue.complete_task(&task.task_id, vec![1.5, 2.5]).unwrap();

    let result = queue.get_task_result(&task.task_id).unwrap();
    assert_eq!(result.as_slice(), &[1.5, 2.5]);
}

#[test]
fn producers_and_consumers_run_concurrently() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 50;
    const CONSUMERS: usize = 4;

    let queue: Arc<ExtractionQueue<u32>> = Arc::new(ExtractionQueue::new());
    let producers_done = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let producers_done = Arc::clone(&producers_done);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..PER_PRODUCER {
                    queue.add_task(station_task(&format!("P{p}S{i:02}"))).unwrap();
                    if i % 10 == 0 {
                        thread::yield_now();
                    }
                }
                producers_done.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let producers_done = Arc::clone(&producers_done);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut seen = Vec::new();
                loop {
                    match queue.get_next_task() {
                        Some(task) if task.retry_count() == 0 => {
                            queue.fail_task(&task.task_id, "flaky", true).unwrap();
                        }
                        Some(task) => {
                            queue.complete_task(&task.task_id, 1).unwrap();
                            seen.push(task.task_id);
                        }
                        None => {
                            let finished = producers_done.load(Ordering::SeqCst) == PRODUCERS;
                            if finished && queue.get_stats().is_drained() {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                }
                seen
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    let completed: Vec<String> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<&String> = completed.iter().collect();

    assert_eq!(completed.len(), PRODUCERS * PER_PRODUCER);
    assert_eq!(unique.len(), completed.len());
    let stats = queue.get_stats();
    assert_eq!(stats.completed, PRODUCERS * PER_PRODUCER);
    assert_eq!(stats.total, PRODUCERS * PER_PRODUCER);
    assert!(stats.is_drained());
    assert!(queue.get_all_tasks()[&TaskStatus::Completed]
        .iter()
        .all(|t| t.retry_count() == 1));
}
