//! Detection workflow
//!
//! Orchestrates one complete detection pass:
//!
//! 1. Check connectivity to the cluster APIs
//! 2. List the known devices, then look up which are registered
//! 3. For every phase: wait for the operator's manual step, then probe
//! 4. Evaluate the runs against the expected verdicts
//! 5. Persist the mismatches (only if there are any)
//!
//! Every component is injected, so the workflow itself holds no I/O.

use crate::config::WorkflowMode;
use crate::device::{Device, Verdict};
use crate::engine::ProbeEngine;
use crate::error::{Error, Result};
use crate::evaluator::{Mismatch, MismatchEvaluator};
use crate::traits::{DirectoryResolver, OperatorGate, ReportSink};
use std::fmt;
use tracing::{debug, info};

/// Manual change the operator applies to every phone before a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAction {
    /// Turn the phones' web access on
    EnableWebAccess,
    /// Turn the phones' web access off
    DisableWebAccess,
}

impl ManualAction {
    /// Verdict every phone should show once the action is applied
    pub fn expected_verdict(&self) -> Verdict {
        match self {
            ManualAction::EnableWebAccess => Verdict::Reachable,
            ManualAction::DisableWebAccess => Verdict::Unreachable,
        }
    }
}

impl fmt::Display for ManualAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManualAction::EnableWebAccess => write!(f, "ENABLE the web access"),
            ManualAction::DisableWebAccess => write!(f, "DISABLE the web access"),
        }
    }
}

/// One manual step followed by one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// Zero-based position in the workflow
    pub index: usize,
    /// What the operator has to do first
    pub action: ManualAction,
    /// Verdict every phone should have afterwards
    pub expected: Verdict,
}

impl Phase {
    fn new(index: usize, action: ManualAction) -> Self {
        Self {
            index,
            action,
            expected: action.expected_verdict(),
        }
    }

    /// Question put to the operator before this phase
    pub fn prompt(&self) -> String {
        format!(
            "(manual step) {} on all devices, restart them and when all registered back, type \"y\": ",
            self.action
        )
    }
}

impl WorkflowMode {
    /// Phases of this workflow, in order
    pub fn phases(&self) -> Vec<Phase> {
        let actions: &[ManualAction] = match self {
            WorkflowMode::EnableDisable => &[
                ManualAction::EnableWebAccess,
                ManualAction::DisableWebAccess,
            ],
            WorkflowMode::Enable => &[ManualAction::EnableWebAccess],
            WorkflowMode::Disable => &[ManualAction::DisableWebAccess],
        };

        actions
            .iter()
            .enumerate()
            .map(|(index, action)| Phase::new(index, *action))
            .collect()
    }
}

/// How a workflow run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The directory knows no phones; nothing was probed
    NoDevicesFound,

    /// None of the known phones is registered; nothing was probed
    NoDevicesRegistered,

    /// The operator declined the manual step of `phase`
    Stopped { phase: Phase },

    /// All phases ran
    Completed {
        /// Number of phones probed per phase
        device_count: usize,
        /// Phones that did not behave as expected
        mismatches: Vec<Mismatch>,
        /// Where the report went, `None` when there was nothing to report
        report_location: Option<String>,
    },
}

/// One complete detection pass over the cluster
pub struct DetectionWorkflow {
    directory: Box<dyn DirectoryResolver>,
    engine: ProbeEngine,
    sink: Box<dyn ReportSink>,
    gate: Box<dyn OperatorGate>,
    mode: WorkflowMode,
}

impl DetectionWorkflow {
    /// Assemble a workflow from its components
    pub fn new(
        directory: Box<dyn DirectoryResolver>,
        engine: ProbeEngine,
        sink: Box<dyn ReportSink>,
        gate: Box<dyn OperatorGate>,
        mode: WorkflowMode,
    ) -> Self {
        Self {
            directory,
            engine,
            sink,
            gate,
            mode,
        }
    }

    /// Run the workflow to completion
    ///
    /// # Returns
    ///
    /// - `Ok(WorkflowOutcome)`: The pass ended normally (including early stops)
    /// - `Err(Error::Connectivity)`: The connectivity check failed, for any reason
    /// - `Err(Error)`: Directory or report failure
    pub async fn run(&self) -> Result<WorkflowOutcome> {
        info!(
            "Running connectivity tests against {}",
            self.directory.directory_name()
        );
        // Whatever the cause, a failed check means the cluster is not usable
        self.directory
            .check_connectivity()
            .await
            .map_err(|e| Error::connectivity(e.to_string()))?;

        let names = self.directory.device_names().await?;
        info!("Directory knows {} device(s)", names.len());
        if names.is_empty() {
            return Ok(WorkflowOutcome::NoDevicesFound);
        }

        let devices = self.directory.registered_devices(&names).await?;
        info!("{} of them are registered", devices.len());
        if devices.is_empty() {
            return Ok(WorkflowOutcome::NoDevicesRegistered);
        }

        let phases = self.mode.phases();
        let mut runs: Vec<Vec<Device>> = Vec::with_capacity(phases.len());

        for phase in &phases {
            if !self.gate.confirm(phase).await {
                info!("Operator stopped the workflow before '{}'", phase.action);
                return Ok(WorkflowOutcome::Stopped { phase: *phase });
            }

            let results = self.engine.run(devices.clone()).await?;
            let matching = results
                .iter()
                .filter(|d| d.web_access() == phase.expected)
                .count();
            info!(
                "After '{}': {} of {} device(s) {}",
                phase.action,
                matching,
                results.len(),
                phase.expected
            );
            debug!(
                "Devices {} after '{}': {:?}",
                phase.expected,
                phase.action,
                results
                    .iter()
                    .filter(|d| d.web_access() == phase.expected)
                    .map(|d| d.name())
                    .collect::<Vec<_>>()
            );

            runs.push(results);
        }

        let evaluator = MismatchEvaluator::new(phases.iter().map(|p| p.expected).collect());
        let mismatches = evaluator.evaluate(&runs)?;

        if mismatches.is_empty() {
            info!("No ITL mismatches found");
            return Ok(WorkflowOutcome::Completed {
                device_count: devices.len(),
                mismatches,
                report_location: None,
            });
        }

        self.sink.write(&mismatches).await?;

        Ok(WorkflowOutcome::Completed {
            device_count: devices.len(),
            mismatches,
            report_location: Some(self.sink.location()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable_phases() {
        let phases = WorkflowMode::EnableDisable.phases();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].action, ManualAction::EnableWebAccess);
        assert_eq!(phases[0].expected, Verdict::Reachable);
        assert_eq!(phases[1].action, ManualAction::DisableWebAccess);
        assert_eq!(phases[1].expected, Verdict::Unreachable);
        assert_eq!(phases[1].index, 1);
    }

    #[test]
    fn test_single_phase_modes() {
        assert_eq!(
            WorkflowMode::Enable.phases()[0].expected,
            Verdict::Reachable
        );
        assert_eq!(
            WorkflowMode::Disable.phases()[0].expected,
            Verdict::Unreachable
        );
    }

    #[test]
    fn test_prompt_text() {
        let phase = WorkflowMode::Disable.phases()[0];
        assert_eq!(
            phase.prompt(),
            "(manual step) DISABLE the web access on all devices, restart them and when all registered back, type \"y\": "
        );
    }
}
