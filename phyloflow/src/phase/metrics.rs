use super::stage::ExecutionMode;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseMetrics {
    pub name: String,
    pub execution: ExecutionMode,
    pub duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

/// Timings for a whole plan, written into the run report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanMetrics {
    pub total_duration_ms: u128,
    pub phases: Vec<PhaseMetrics>,
}

impl PlanMetrics {
    pub fn task_duration_ms(&self, name: &str) -> Option<u128> {
        self.phases
            .iter()
            .flat_map(|phase| phase.tasks.iter())
            .find(|task| task.name == name)
            .map(|task| task.duration_ms)
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|phase| phase.name.as_str()).collect()
    }
}
