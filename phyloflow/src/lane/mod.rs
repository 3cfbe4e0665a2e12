//! Lane pools: per-class concurrency limits expressed as false dependencies.
//!
//! A pool of `L` lanes remembers the last future placed on each lane. Each
//! new task takes the next lane in round-robin order and depends on that
//! lane's previous occupant, so at most `L` tasks of the class can be
//! runnable at once. Nothing is ever released; completion of the predecessor
//! is the release.

use crate::executor::{TaskFuture, TaskId};
use crate::runtime::options::Settings;
use crate::template::ResourceClass;
use std::collections::HashMap;

/// Number of lanes for a partition of `budget` cores and tasks needing
/// `threads` cores each. Never below one.
pub fn lane_capacity(budget: u32, threads: u32) -> usize {
    let threads = threads.max(1);
    ((budget / threads) as usize).max(1)
}

/// Result of placing a task on a lane.
#[derive(Debug, Clone)]
pub struct LaneAssignment {
    pub lane: usize,
    pub future: TaskFuture,
    /// Previous occupant of the lane, attached as an extra dependency.
    pub predecessor: Option<TaskId>,
}

/// Ring of lanes for one resource class.
#[derive(Debug)]
pub struct LanePool {
    class: ResourceClass,
    lanes: Vec<Option<TaskFuture>>,
    cursor: usize,
}

impl LanePool {
    pub fn new(class: ResourceClass, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            class,
            lanes: vec![None; capacity],
            // First advance lands on lane 0.
            cursor: capacity - 1,
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn capacity(&self) -> usize {
        self.lanes.len()
    }

    /// Move to the next lane and return its index.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.lanes.len();
        self.cursor
    }

    /// Most recent future placed on `lane`.
    pub fn occupant(&self, lane: usize) -> Option<&TaskFuture> {
        self.lanes.get(lane).and_then(Option::as_ref)
    }

    /// Place `future` on `lane`, returning the previous occupant.
    pub fn occupy(&mut self, lane: usize, future: TaskFuture) -> Option<TaskFuture> {
        self.lanes[lane].replace(future)
    }

    /// Advance, hand the lane's predecessor to `submit`, and store the
    /// future it returns.
    ///
    /// Taking `&mut self` makes the whole sequence atomic for the class.
    pub fn assign<F>(&mut self, submit: F) -> LaneAssignment
    where
        F: FnOnce(Option<&TaskFuture>) -> TaskFuture,
    {
        let lane = self.advance();
        let predecessor = self.occupant(lane).cloned();
        let future = submit(predecessor.as_ref());
        self.occupy(lane, future.clone());

        tracing::trace!(
            class = %self.class,
            lane,
            task = %future.id(),
            predecessor = ?predecessor.as_ref().map(TaskFuture::id),
            "Assigned lane"
        );

        LaneAssignment {
            lane,
            future,
            predecessor: predecessor.map(|p| p.id()),
        }
    }
}

/// One [`LanePool`] per resource class, sized once per run.
#[derive(Debug, Default)]
pub struct LanePoolAllocator {
    pools: HashMap<ResourceClass, LanePool>,
}

impl LanePoolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size every class from its partition budget and the widest stage
    /// mapped to it.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut allocator = Self::new();
        for class in ResourceClass::ALL {
            let budget = settings.partition(class).budget();
            let threads = settings.class_threads(class);
            let capacity = lane_capacity(budget, threads);
            tracing::info!(
                class = %class,
                budget,
                threads,
                lanes = capacity,
                "Sized lane pool"
            );
            allocator.insert(LanePool::new(class, capacity));
        }
        allocator
    }

    pub fn insert(&mut self, pool: LanePool) {
        self.pools.insert(pool.class(), pool);
    }

    pub fn capacity(&self, class: ResourceClass) -> Option<usize> {
        self.pools.get(&class).map(LanePool::capacity)
    }

    /// Pool for `class`, created with a single lane if it was never sized.
    pub fn pool_mut(&mut self, class: ResourceClass) -> &mut LanePool {
        self.pools
            .entry(class)
            .or_insert_with(|| LanePool::new(class, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TaskPromise;
    use crate::template::StageKind;
    use std::path::Path;

    fn submit(id: u64, promises: &mut Vec<TaskPromise>) -> TaskFuture {
        let (promise, future) =
            TaskFuture::pending_for(TaskId(id), StageKind::TreeInference, Path::new("/d"));
        promises.push(promise);
        future
    }

    #[test]
    fn test_capacity_from_budget() {
        assert_eq!(lane_capacity(24, 6), 4);
        assert_eq!(lane_capacity(24, 32), 1);
        assert_eq!(lane_capacity(24, 0), 24);
        assert_eq!(lane_capacity(0, 4), 1);
    }

    #[test]
    fn test_fifth_task_waits_on_first() {
        let mut pool = LanePool::new(ResourceClass::TreeAndStatistics, lane_capacity(24, 6));
        let mut promises = Vec::new();

        let assignments: Vec<_> = (1..=5)
            .map(|id| pool.assign(|_| submit(id, &mut promises)))
            .collect();

        let lanes: Vec<_> = assignments.iter().map(|a| a.lane).collect();
        assert_eq!(lanes, vec![0, 1, 2, 3, 0]);
        for a in &assignments[..4] {
            assert_eq!(a.predecessor, None);
        }
        assert_eq!(assignments[4].predecessor, Some(TaskId(1)));
    }

    #[test]
    fn test_single_lane_serializes() {
        let mut pool = LanePool::new(ResourceClass::PhylogeneticNetwork, lane_capacity(24, 32));
        assert_eq!(pool.capacity(), 1);
        let mut promises = Vec::new();

        let first = pool.assign(|pred| {
            assert!(pred.is_none());
            submit(1, &mut promises)
        });
        let second = pool.assign(|pred| {
            assert_eq!(pred.map(TaskFuture::id), Some(TaskId(1)));
            submit(2, &mut promises)
        });
        assert_eq!(first.lane, 0);
        assert_eq!(second.predecessor, Some(TaskId(1)));
    }

    #[test]
    fn test_allocator_sizes_from_settings() {
        let mut settings = Settings::default();
        settings.partitions.tree_and_statistics.cores_per_node = 12;
        settings.partitions.tree_and_statistics.nodes = 2;
        settings.raxml.threads = 6;
        settings.iqtree.threads = 4;

        let allocator = LanePoolAllocator::from_settings(&settings);
        assert_eq!(allocator.capacity(ResourceClass::TreeAndStatistics), Some(4));
    }

    #[test]
    fn test_unsized_class_gets_one_lane() {
        let mut allocator = LanePoolAllocator::new();
        assert_eq!(allocator.capacity(ResourceClass::SingleThread), None);
        assert_eq!(allocator.pool_mut(ResourceClass::SingleThread).capacity(), 1);
    }
}
