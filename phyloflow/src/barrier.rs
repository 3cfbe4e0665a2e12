//! Synchronization points over sets of task futures.
//!
//! Waiting never short-circuits: every future is driven to completion before
//! results are inspected, so a barrier returns only when nothing it covers is
//! still running.

use crate::executor::{TaskFailure, TaskFuture, TaskOutput};
use futures::future::join_all;
use std::time::Instant;

/// Wait for every future, then return all outputs or the first failure.
///
/// Outputs and the reported failure follow input order.
pub async fn wait_for_all(futures: &[TaskFuture]) -> Result<Vec<TaskOutput>, TaskFailure> {
    let results = join_all(futures.iter().map(TaskFuture::result)).await;
    results.into_iter().collect()
}

/// Labelled collection of futures awaited together.
#[derive(Debug, Default)]
pub struct Barrier {
    label: String,
    futures: Vec<TaskFuture>,
}

impl Barrier {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            futures: Vec::new(),
        }
    }

    pub fn add(&mut self, future: TaskFuture) {
        self.futures.push(future);
    }

    pub fn extend(&mut self, futures: impl IntoIterator<Item = TaskFuture>) {
        self.futures.extend(futures);
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// Wait for all futures; returns the first failure in insertion order.
    pub async fn wait(self) -> Result<Vec<TaskOutput>, TaskFailure> {
        let started = Instant::now();
        tracing::info!(barrier = %self.label, tasks = self.futures.len(), "Waiting at barrier");

        let result = wait_for_all(&self.futures).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(barrier = %self.label, elapsed_ms, "Barrier passed"),
            Err(failure) => tracing::warn!(
                barrier = %self.label,
                elapsed_ms,
                failure = %failure,
                "Barrier passed with failures"
            ),
        }
        result
    }

    /// Wait for all futures and return every failure instead of the first.
    pub async fn wait_collect(self) -> Vec<TaskFailure> {
        let results = join_all(self.futures.iter().map(TaskFuture::result)).await;
        let failures: Vec<TaskFailure> = results.into_iter().filter_map(Result::err).collect();
        tracing::info!(
            barrier = %self.label,
            tasks = self.futures.len(),
            failures = failures.len(),
            "Barrier passed"
        );
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FailureKind, TaskId};
    use crate::template::StageKind;
    use std::path::Path;
    use std::time::Duration;

    fn pending(id: u64) -> (crate::executor::TaskPromise, TaskFuture) {
        TaskFuture::pending_for(TaskId(id), StageKind::TreeInference, Path::new("/data/d1"))
    }

    #[tokio::test]
    async fn test_waits_for_all_even_after_failure() {
        let (p1, f1) = pending(1);
        let (p2, f2) = pending(2);
        let (p3, f3) = pending(3);

        p2.fail(FailureKind::Exited(1));
        let slow = f3.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            p1.succeed(0, 1);
            p3.succeed(0, 1);
        });

        let failure = wait_for_all(&[f1.clone(), f2, f3]).await.unwrap_err();
        assert_eq!(failure.task, TaskId(2));
        assert!(f1.done());
        assert!(slow.done());
    }

    #[tokio::test]
    async fn test_first_failure_in_input_order() {
        let (p1, f1) = pending(1);
        let (p2, f2) = pending(2);
        p2.fail(FailureKind::Exited(2));
        p1.fail(FailureKind::Signaled);

        let failure = wait_for_all(&[f1, f2]).await.unwrap_err();
        assert_eq!(failure.task, TaskId(1));
    }

    #[tokio::test]
    async fn test_barrier_outputs_in_order() {
        let mut barrier = Barrier::new("final");
        let mut promises = Vec::new();
        for id in 1..=3 {
            let (promise, future) = pending(id);
            barrier.add(future);
            promises.push(promise);
        }
        assert_eq!(barrier.len(), 3);
        for promise in promises.into_iter().rev() {
            promise.succeed(0, 0);
        }

        let outputs = barrier.wait().await.unwrap();
        let ids: Vec<_> = outputs.iter().map(|o| o.task).collect();
        assert_eq!(ids, vec![TaskId(1), TaskId(2), TaskId(3)]);
    }

    #[tokio::test]
    async fn test_empty_barrier_passes() {
        assert!(wait_for_all(&[]).await.unwrap().is_empty());
        assert!(Barrier::new("empty").wait_collect().await.is_empty());
    }
}
