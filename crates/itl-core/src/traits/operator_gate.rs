// # Operator Gate Trait
//
// The configuration change between probe runs is done by a person, outside
// this tool. The workflow waits on an `OperatorGate` before every phase.

use async_trait::async_trait;

use crate::workflow::Phase;

/// Trait for operator confirmation
#[async_trait]
pub trait OperatorGate: Send + Sync {
    /// Ask the operator to perform the phase's manual step
    ///
    /// # Returns
    ///
    /// - `true`: The step is done, probe now
    /// - `false`: The operator wants to stop
    async fn confirm(&self, phase: &Phase) -> bool;
}

/// Gate that confirms every phase immediately
///
/// For unattended runs where the change is already in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl OperatorGate for AssumeYes {
    async fn confirm(&self, phase: &Phase) -> bool {
        tracing::info!("Assuming '{}' has been done", phase.action);
        true
    }
}
