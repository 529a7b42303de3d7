// # itl-detector
//
// Finds phones of a CUCM cluster that ignore configuration changes because
// their Initial Trust List (ITL) no longer matches the cluster.
//
// The binary is a thin integration layer: it reads the configuration,
// asks for missing credentials, wires the components into a
// `DetectionWorkflow` and prints what the operator needs to see. All
// detection logic lives in itl-core.
//
// ## Configuration
//
// Environment variables (all optional):
//
// ### Cluster
// - `ITL_CUCM_HOST`: CUCM publisher address (prompted when unset)
// - `ITL_USERNAME`: AXL API user (prompted when unset)
// - `ITL_PASSWORD`: AXL API password (prompted when unset)
// - `ITL_CUCM_PORT`: HTTPS port of AXL/RIS (default 8443)
// - `ITL_AXL_VERSION`: AXL schema version (default 10.0)
// - `ITL_VERIFY_TLS`: Verify the cluster certificate (default false)
//
// ### Probing
// - `ITL_CONCURRENCY`: Phones probed at once (default 30)
// - `ITL_PROBE_TIMEOUT_SECS`: Per-phone deadline (default 30)
//
// ### Workflow and report
// - `ITL_WORKFLOW`: enable-disable, enable or disable (default enable-disable)
// - `ITL_ASSUME_YES`: Skip the manual step prompts
// - `ITL_REPORT_TYPE`: csv or memory (default csv)
// - `ITL_OUTPUT`: CSV path (default devices_with_itl_mismatches.csv)
// - `ITL_LOG_LEVEL`: trace, debug, info, warn, error (default warn)
//
// ## Example
//
// ```bash
// export ITL_CUCM_HOST=10.1.1.1
// export ITL_USERNAME=axladmin
// export ITL_CONCURRENCY=50
//
// itl-detector
// ```

mod config;
mod gate;

use anyhow::Result;
use config::Config;
use itl_core::traits::{AssumeYes, OperatorGate};
use itl_core::{ComponentRegistry, DetectionWorkflow, Error, ProbeEngine, ProbeEvent, WorkflowOutcome};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorExitCode {
    /// The pass finished (with or without mismatches)
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Directory, probe session or report failure
    RuntimeError = 2,
    /// The operator declined a manual step or interrupted the run
    Stopped = 3,
}

impl From<DetectorExitCode> for ExitCode {
    fn from(code: DetectorExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let mut config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DetectorExitCode::ConfigError.into();
        }
    };

    if let Err(e) = prompt_missing(&mut config) {
        eprintln!("Configuration error: {}", e);
        return DetectorExitCode::ConfigError.into();
    }

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DetectorExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr, stdout belongs to the operator dialogue
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DetectorExitCode::ConfigError.into();
    }

    info!("Starting itl-detector");
    info!("Configuration loaded: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DetectorExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(run(config));

    // A pending prompt keeps a blocking thread parked on stdin
    rt.shutdown_background();

    code.into()
}

/// Ask for the cluster address and credentials the environment left out
fn prompt_missing(config: &mut Config) -> Result<()> {
    if config.host.is_none() {
        config.host = Some(gate::ask("IP address of CUCM Publisher: ")?.trim().to_string());
    }
    if config.username.is_none() {
        config.username = Some(gate::ask("API Username: ")?.trim().to_string());
    }
    if config.password.is_none() {
        let password = gate::ask("API Password: ")?;
        config.password = Some(password.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(())
}

/// Build the components and run one detection pass
async fn run(config: Config) -> DetectorExitCode {
    let (workflow, events) = match build_workflow(&config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {}", e);
            eprintln!("Startup error: {}", e);
            return DetectorExitCode::ConfigError;
        }
    };

    let printer = tokio::spawn(print_events(events));
    let host = config.host.as_deref().unwrap_or_default();

    let code = tokio::select! {
        result = workflow.run() => report(host, result),
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT");
            println!();
            println!("The script was stopped!");
            DetectorExitCode::Stopped
        }
    };

    // Dropping the workflow closes the event channel
    drop(workflow);
    if let Err(e) = printer.await {
        error!("Event printer failed: {}", e);
    }

    code
}

/// Wire the registry, engine and workflow from the configuration
fn build_workflow(config: &Config) -> Result<(DetectionWorkflow, mpsc::Receiver<ProbeEvent>)> {
    let detector = config.to_detector_config()?;

    let registry = ComponentRegistry::with_builtin_sinks();

    #[cfg(feature = "cucm")]
    {
        info!("Registering CUCM directory");
        itl_directory_cucm::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP prober");
        itl_probe_http::register(&registry);
    }

    let directory = registry.create_directory(&detector.directory)?;
    let factory = registry.prober_factory(&detector.prober)?;
    let sink = registry.create_report_sink(&detector.report)?;

    let (engine, events) = ProbeEngine::new(factory, detector.prober.clone(), detector.engine.clone())?;

    let gate: Box<dyn OperatorGate> = if config.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(gate::TerminalGate)
    };

    let workflow = DetectionWorkflow::new(directory, engine, sink, gate, detector.workflow);
    Ok((workflow, events))
}

/// Print probe progress the way the operator expects it
async fn print_events(events: mpsc::Receiver<ProbeEvent>) {
    let mut events = ReceiverStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            ProbeEvent::RunStarted {
                device_count,
                concurrency_limit,
            } => {
                println!(
                    "Testing {} registered device(s), {} at a time",
                    device_count, concurrency_limit
                );
            }
            ProbeEvent::ProbeStarted { name, ip_address } => {
                println!("Testing device: {} {}", name, ip_address);
            }
            ProbeEvent::ProbeCompleted {
                name,
                outcome,
                verdict,
                ..
            } => {
                tracing::debug!("{}: {} ({})", name, verdict, outcome);
            }
            ProbeEvent::RunFinished {
                reachable,
                unreachable,
                elapsed,
            } => {
                println!(
                    "Web access reachable on {} device(s), unreachable on {} ({:.1?})",
                    reachable, unreachable, elapsed
                );
            }
        }
    }
}

/// Tell the operator how the pass ended
fn report(host: &str, result: itl_core::Result<WorkflowOutcome>) -> DetectorExitCode {
    match result {
        Ok(WorkflowOutcome::NoDevicesFound) => {
            println!("No devices found!");
            DetectorExitCode::Success
        }
        Ok(WorkflowOutcome::NoDevicesRegistered) => {
            println!("No devices registered!");
            DetectorExitCode::Success
        }
        Ok(WorkflowOutcome::Stopped { phase }) => {
            info!("Stopped before phase {}", phase.index + 1);
            println!("The script was stopped!");
            DetectorExitCode::Stopped
        }
        Ok(WorkflowOutcome::Completed {
            device_count,
            mismatches,
            report_location,
        }) => {
            info!("Pass over {} device(s) finished", device_count);
            if mismatches.is_empty() {
                println!("No ITL mismatches found");
                return DetectorExitCode::Success;
            }

            println!(
                "Detected {} devices with potential ITL mismatches!",
                mismatches.len()
            );
            for mismatch in &mismatches {
                println!("  {} {}", mismatch.name, mismatch.ip_address);
            }
            if let Some(location) = report_location {
                println!("Saved devices into {}", location);
            }
            DetectorExitCode::Success
        }
        Err(e) => {
            error!("Detection against {} failed: {}", host, e);
            println!("{}", failure_message(&e));
            DetectorExitCode::RuntimeError
        }
    }
}

/// Operator-facing text for a failed pass
fn failure_message(error: &Error) -> String {
    match error {
        Error::Connectivity(_) => {
            "The connection failed or the username/password is incorrect.".to_string()
        }
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itl_core::Mismatch;
    use itl_core::Verdict;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DetectorExitCode::Success as u8, 0);
        assert_eq!(DetectorExitCode::ConfigError as u8, 1);
        assert_eq!(DetectorExitCode::RuntimeError as u8, 2);
        assert_eq!(DetectorExitCode::Stopped as u8, 3);
    }

    #[test]
    fn test_report_outcomes() {
        assert_eq!(
            report("cucm", Ok(WorkflowOutcome::NoDevicesFound)),
            DetectorExitCode::Success
        );
        assert_eq!(
            report("cucm", Err(Error::connectivity("401"))),
            DetectorExitCode::RuntimeError
        );

        let phase = itl_core::config::WorkflowMode::Enable.phases()[0];
        assert_eq!(
            report("cucm", Ok(WorkflowOutcome::Stopped { phase })),
            DetectorExitCode::Stopped
        );

        let mismatch = Mismatch {
            name: "SEP001122334455".to_string(),
            ip_address: "10.0.0.1".to_string(),
            expected: vec![Verdict::Reachable],
            observed: vec![Verdict::Unreachable],
        };
        assert_eq!(
            report(
                "cucm",
                Ok(WorkflowOutcome::Completed {
                    device_count: 1,
                    mismatches: vec![mismatch],
                    report_location: Some("out.csv".to_string()),
                })
            ),
            DetectorExitCode::Success
        );
    }

    #[test]
    fn test_credentials_message_only_for_connectivity_failures() {
        let credentials = "The connection failed or the username/password is incorrect.";

        assert_eq!(
            failure_message(&Error::connectivity("The connection to https://cucm:8443/axl/ timed out.")),
            credentials
        );
        assert_eq!(failure_message(&Error::connectivity("401 Unauthorized")), credentials);

        // Later AXL/RIS failures keep their own text
        let later = failure_message(&Error::http("Request to https://cucm:8443/axl/ failed"));
        assert_ne!(later, credentials);
        assert!(later.contains("Request to https://cucm:8443/axl/ failed"));
    }

    #[test]
    fn test_build_workflow_with_memory_report() {
        let mut config = Config::from_lookup(|key| match key {
            "ITL_CUCM_HOST" => Some("10.1.1.1".to_string()),
            "ITL_USERNAME" => Some("axladmin".to_string()),
            "ITL_PASSWORD" => Some("s3cret".to_string()),
            "ITL_REPORT_TYPE" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();
        config.assume_yes = true;

        assert!(build_workflow(&config).is_ok());
    }
}
