//! Mismatch evaluation
//!
//! Compares the verdicts of one or more probe runs against the verdict each
//! run was expected to produce. Pure set logic, no I/O.
//!
//! Devices are matched across runs by name, since each run returns its
//! results in completion order.

use crate::device::{Device, Verdict};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A device whose verdicts did not follow the expected transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Device name
    pub name: String,
    /// IP address as reported by the directory
    pub ip_address: String,
    /// Expected verdict, one per phase
    pub expected: Vec<Verdict>,
    /// Observed verdict, one per phase (`Unknown` if absent from that run)
    pub observed: Vec<Verdict>,
}

impl Mismatch {
    /// Zero-based indices of the phases that did not match
    pub fn failed_phases(&self) -> Vec<usize> {
        self.expected
            .iter()
            .zip(&self.observed)
            .enumerate()
            .filter(|(_, (expected, observed))| expected != observed)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Evaluates probe runs against expected verdicts
#[derive(Debug, Clone)]
pub struct MismatchEvaluator {
    expected: Vec<Verdict>,
}

impl MismatchEvaluator {
    /// Create an evaluator expecting one verdict per run
    pub fn new(expected: Vec<Verdict>) -> Self {
        Self { expected }
    }

    /// Expected verdicts, one per run
    pub fn expected(&self) -> &[Verdict] {
        &self.expected
    }

    /// Find every device whose verdict differs from the expectation in at
    /// least one run
    ///
    /// # Parameters
    ///
    /// - `runs`: Probe results, in the same order as the expected verdicts
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Mismatch>)`: Mismatches ordered by device name, each device once
    /// - `Err(Error::InvalidInput)`: `runs.len()` differs from the number of
    ///   expected verdicts
    pub fn evaluate(&self, runs: &[Vec<Device>]) -> Result<Vec<Mismatch>> {
        if runs.len() != self.expected.len() {
            return Err(Error::invalid_input(format!(
                "Expected {} probe run(s), got {}",
                self.expected.len(),
                runs.len()
            )));
        }

        let phases = runs.len();
        let mut population: BTreeMap<&str, (&str, Vec<Verdict>)> = BTreeMap::new();

        for (phase, run) in runs.iter().enumerate() {
            for device in run {
                let entry = population
                    .entry(device.name())
                    .or_insert_with(|| (device.ip_address(), vec![Verdict::Unknown; phases]));
                entry.1[phase] = device.web_access();
            }
        }

        let mismatches = population
            .into_iter()
            .filter(|(_, (_, observed))| *observed != self.expected)
            .map(|(name, (ip_address, observed))| Mismatch {
                name: name.to_string(),
                ip_address: ip_address.to_string(),
                expected: self.expected.clone(),
                observed,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Evaluated {} run(s): {} mismatch(es)",
            phases,
            mismatches.len()
        );

        Ok(mismatches)
    }
}
