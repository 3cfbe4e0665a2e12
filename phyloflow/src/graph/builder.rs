//! Expands pipeline templates into submitted, lane-wired tasks.

use super::inputs::InputCatalog;
use super::task::{StageInstance, Task, TaskKey};
use crate::barrier::wait_for_all;
use crate::executor::{Dependencies, TaskExecutor, TaskFuture, TaskId, TaskUnit};
use crate::lane::LanePoolAllocator;
use crate::runtime::options::Settings;
use crate::template::{EdgeShape, Multiplicity, PipelineTemplate, StageKind, StageSpec};
use crate::tools::CommandBuilder;
use crate::workload::WorkItem;
use parking_lot::Mutex;
use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tasks created for one variant.
#[derive(Debug, Clone)]
pub struct BuiltPipeline {
    pub tasks: Vec<Task>,
    /// Futures of the template's leaf stages.
    pub leaves: Vec<TaskFuture>,
}

/// Per-run graph builder shared by every pipeline of the run.
///
/// **Locking**: `memo` and `lanes` are only held inside [`ensure_task`] and
/// [`ensure_plot`] (memo first, then lanes) and never across an `.await`.
///
/// [`ensure_task`]: GraphBuilder::ensure_task
/// [`ensure_plot`]: GraphBuilder::ensure_plot
pub struct GraphBuilder {
    settings: Arc<Settings>,
    executor: Arc<dyn TaskExecutor>,
    inputs: Arc<dyn InputCatalog>,
    lanes: Mutex<LanePoolAllocator>,
    memo: Mutex<HashMap<TaskKey, Task>>,
    next_id: AtomicU64,
}

impl GraphBuilder {
    pub fn new(
        settings: Arc<Settings>,
        executor: Arc<dyn TaskExecutor>,
        inputs: Arc<dyn InputCatalog>,
    ) -> Self {
        let lanes = LanePoolAllocator::from_settings(&settings);
        Self::with_lanes(settings, executor, inputs, lanes)
    }

    pub fn with_lanes(
        settings: Arc<Settings>,
        executor: Arc<dyn TaskExecutor>,
        inputs: Arc<dyn InputCatalog>,
        lanes: LanePoolAllocator,
    ) -> Self {
        Self {
            settings,
            executor,
            inputs,
            lanes: Mutex::new(lanes),
            memo: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Data preparation task for the item's directory, created on first use.
    pub fn ensure_data_prep(&self, item: &WorkItem) -> PhyloflowResult<Task> {
        self.ensure_task(item, StageKind::DataPrep, 0, &StageInstance::Single, Vec::new())
    }

    /// Return the memoized task for this key, or build and submit it.
    ///
    /// The lane predecessor is attached to the submission and the new future
    /// is stored in the lane in the same critical section.
    pub fn ensure_task(
        &self,
        item: &WorkItem,
        stage: StageKind,
        index: usize,
        instance: &StageInstance,
        dependencies: Vec<TaskFuture>,
    ) -> PhyloflowResult<Task> {
        let lineage = (stage != StageKind::DataPrep).then_some(item.tree_method);
        let key = TaskKey {
            directory: item.directory.clone(),
            stage,
            lineage,
            instance: index,
        };

        let mut memo = self.memo.lock();
        if let Some(task) = memo.get(&key) {
            tracing::trace!(task = %task.id, label = %task.label, "Reusing task");
            return Ok(task.clone());
        }

        let command = CommandBuilder::new(&self.settings).command(item, stage, instance)?;
        let label = match lineage {
            Some(tree) => format!(
                "{}[{}] {} ({})",
                stage,
                index,
                item.directory.display(),
                tree
            ),
            None => format!("{} {}", stage, item.directory.display()),
        };
        let threads = self.settings.threads_for(stage, item.tree_method);
        Ok(self.place(&mut memo, key, label, command, threads, dependencies))
    }

    /// Submit the run-wide network plot over `networks`.
    ///
    /// The job runs from the settings directory and is memoized like any
    /// other task, so a second call returns the first submission.
    pub fn ensure_plot(&self, networks: &[PathBuf]) -> PhyloflowResult<Task> {
        let key = TaskKey {
            directory: self.settings.base_dir.clone(),
            stage: StageKind::NetworkPlot,
            lineage: None,
            instance: 0,
        };

        let mut memo = self.memo.lock();
        if let Some(task) = memo.get(&key) {
            return Ok(task.clone());
        }
        if networks.is_empty() {
            return Err(PhyloflowError::Build {
                directory: key.directory.display().to_string(),
                stage: StageKind::NetworkPlot.to_string(),
                reason: "no network files to plot".to_string(),
            });
        }

        let command = CommandBuilder::new(&self.settings).plot(networks);
        let label = format!("{} ({} networks)", StageKind::NetworkPlot, networks.len());
        Ok(self.place(&mut memo, key, label, command, 1, Vec::new()))
    }

    /// Submit a unit on its class's next lane and memoize the task.
    ///
    /// Called with the memo lock held; takes the lanes lock for the
    /// duration of the submission.
    fn place(
        &self,
        memo: &mut HashMap<TaskKey, Task>,
        key: TaskKey,
        label: String,
        command: String,
        threads: u32,
        dependencies: Vec<TaskFuture>,
    ) -> Task {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let class = key.stage.resource_class();
        let unit = TaskUnit {
            id,
            stage: key.stage,
            directory: key.directory.clone(),
            partition: class,
            threads,
            command,
            label: label.clone(),
        };
        let data_dependencies: Vec<TaskId> = dependencies.iter().map(TaskFuture::id).collect();

        let assignment = self.lanes.lock().pool_mut(class).assign(|predecessor| {
            let dependencies = Dependencies::data(dependencies).with_lane(predecessor.cloned());
            self.executor.submit(unit, dependencies)
        });

        tracing::debug!(
            task = %id,
            label = %label,
            class = %class,
            lane = assignment.lane,
            dependencies = data_dependencies.len(),
            lane_dependency = ?assignment.predecessor,
            "Submitted task"
        );

        let task = Task {
            id,
            key: key.clone(),
            label,
            data_dependencies,
            lane_dependency: assignment.predecessor,
            future: assignment.future,
        };
        memo.insert(key, task.clone());
        task
    }

    /// Expand `template` for `item` and submit every task.
    ///
    /// Stages flagged as barriers wait for all upstream futures before they
    /// are expanded; an upstream failure then fails this build with the
    /// task's error. Any error affects only this item's subgraph.
    pub async fn build(
        &self,
        item: &WorkItem,
        template: &PipelineTemplate,
    ) -> PhyloflowResult<BuiltPipeline> {
        let mut by_stage: HashMap<StageKind, Vec<Task>> = HashMap::new();
        let mut tasks = Vec::new();

        for spec in template.stages {
            let mut upstream = Vec::with_capacity(spec.after.len());
            for (kind, shape) in spec.after {
                let stage_tasks = by_stage
                    .get(kind)
                    .ok_or_else(|| build_error(item, spec.kind, format!("{} not expanded", kind)))?;
                upstream.push((stage_tasks, *shape));
            }

            if spec.barrier {
                let futures: Vec<TaskFuture> = upstream
                    .iter()
                    .flat_map(|(stage_tasks, _)| stage_tasks.iter().map(|t| t.future.clone()))
                    .collect();
                tracing::debug!(
                    directory = %item.directory.display(),
                    stage = %spec.kind,
                    upstream = futures.len(),
                    "Waiting for upstream before expanding"
                );
                wait_for_all(&futures).await.map_err(PhyloflowError::from)?;
            }

            let instances = self.expand(item, spec)?;
            let mut stage_tasks = Vec::with_capacity(instances.len());
            for (index, instance) in instances.iter().enumerate() {
                let mut dependencies = Vec::new();
                for (upstream_tasks, shape) in &upstream {
                    match shape {
                        EdgeShape::All => dependencies
                            .extend(upstream_tasks.iter().map(|t| t.future.clone())),
                        EdgeShape::Paired => {
                            let paired = upstream_tasks.get(index).ok_or_else(|| {
                                build_error(
                                    item,
                                    spec.kind,
                                    format!(
                                        "instance {} has no paired upstream ({} upstream)",
                                        index,
                                        upstream_tasks.len()
                                    ),
                                )
                            })?;
                            dependencies.push(paired.future.clone());
                        }
                    }
                }

                let task = if spec.kind == StageKind::DataPrep {
                    self.ensure_data_prep(item)?
                } else {
                    self.ensure_task(item, spec.kind, index, instance, dependencies)?
                };
                stage_tasks.push(task);
            }

            tasks.extend(stage_tasks.iter().cloned());
            by_stage.insert(spec.kind, stage_tasks);
        }

        let leaves = template
            .leaves()
            .iter()
            .filter_map(|kind| by_stage.get(kind))
            .flat_map(|stage_tasks| stage_tasks.iter().map(|t| t.future.clone()))
            .collect();

        tracing::info!(
            item = %item.label(),
            tasks = tasks.len(),
            "Pipeline submitted"
        );
        Ok(BuiltPipeline { tasks, leaves })
    }

    fn expand(&self, item: &WorkItem, spec: &StageSpec) -> PhyloflowResult<Vec<StageInstance>> {
        match spec.multiplicity {
            Multiplicity::Once => Ok(vec![StageInstance::Single]),
            Multiplicity::PerInput(set) => {
                let files = self.inputs.list(&item.directory, set)?;
                if files.is_empty() {
                    return Err(build_error(
                        item,
                        spec.kind,
                        format!("no input files in {}", set.subdirectory()),
                    ));
                }
                Ok(files.into_iter().map(StageInstance::Input).collect())
            }
            Multiplicity::PerHmax => {
                if item.hmax_values.is_empty() {
                    return Err(build_error(item, spec.kind, "no hmax values".to_string()));
                }
                Ok(item
                    .hmax_values
                    .iter()
                    .map(|h| StageInstance::Hmax(*h))
                    .collect())
            }
        }
    }

    /// Every task created so far, in submission order.
    pub fn tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.memo.lock().values().cloned().collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    pub fn lane_capacity(&self, class: crate::template::ResourceClass) -> Option<usize> {
        self.lanes.lock().capacity(class)
    }
}

fn build_error(item: &WorkItem, stage: StageKind, reason: String) -> PhyloflowError {
    PhyloflowError::Build {
        directory: item.directory.display().to_string(),
        stage: stage.to_string(),
        reason,
    }
}
