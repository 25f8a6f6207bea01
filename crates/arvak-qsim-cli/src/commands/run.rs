//! Run command implementation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use console::style;
use serde::Serialize;
use tracing::debug;

use arvak_qsim::{
    GateOperation, InstanceId, LimitsConfig, QsimConfig, Qubit, SimulatorRegistry, StateDump,
};

use super::common::{BackendHandle, backend_kind, print_state};
use crate::OutputFormat;
use crate::program::{GateStep, Program, Step};

/// One gate invocation as seen by the trace backend.
#[derive(Debug, Serialize)]
pub struct CallRow {
    pub gate: String,
    pub controls: Vec<u32>,
    pub targets: Vec<u32>,
}

/// Outcome of running a program.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub program: String,
    pub backend: String,
    pub gates_applied: usize,
    pub live_qubits: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls: Option<Vec<CallRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateDump>,
}

/// Execute the run command.
pub fn execute(
    input: &Path,
    backend: Option<&str>,
    format: OutputFormat,
    config: &QsimConfig,
) -> Result<()> {
    let program = Program::from_file(input)?;
    let kind = backend_kind(backend, config)?;
    let handle = BackendHandle::new(kind, config);
    let backend_impl = handle.backend();

    if format == OutputFormat::Table {
        println!(
            "{} Running {} on {} ({} qubits, {} gates)",
            style("→").cyan().bold(),
            style(&program.name).green(),
            style(backend_impl.name()).yellow(),
            program.qubits,
            program.gate_count()
        );
    }

    let registry = SimulatorRegistry::with_limits(backend_impl, config.limits.clone());
    let start = Instant::now();
    let outcome = run_program(&program, &registry)?;
    let elapsed = start.elapsed();

    let report = RunReport {
        program: program.name.clone(),
        backend: registry.backend_name().to_string(),
        gates_applied: outcome.gates_applied,
        live_qubits: outcome.live_qubits,
        elapsed_ms: elapsed.as_millis() as u64,
        calls: handle.recorded_calls().map(|calls| {
            calls
                .into_iter()
                .map(|c| CallRow {
                    gate: c.gate.to_string(),
                    controls: c.controls.iter().map(|q| q.0).collect(),
                    targets: c.targets.iter().map(|q| q.0).collect(),
                })
                .collect()
        }),
        state: outcome.state,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "  Applied {} gates, {} qubits live",
        report.gates_applied, report.live_qubits
    );

    if let Some(calls) = &report.calls {
        println!("\n{} Backend calls:", style("✓").green().bold());
        for (i, call) in calls.iter().enumerate() {
            let controls = if call.controls.is_empty() {
                String::new()
            } else {
                format!(" ctrl {:?}", call.controls)
            };
            println!(
                "  {:>4}  {}{} -> {:?}",
                i + 1,
                style(&call.gate).cyan(),
                style(controls).yellow(),
                call.targets
            );
        }
    }

    if let Some(state) = &report.state {
        print_state(state);
    }

    println!(
        "\n  Execution time: {} ms",
        style(report.elapsed_ms).yellow()
    );
}

/// Result of driving one program through a registry.
#[derive(Debug)]
pub struct ProgramOutcome {
    pub gates_applied: usize,
    pub live_qubits: usize,
    /// Final state, when the backend can dump it.
    pub state: Option<StateDump>,
}

/// Run `program` on a fresh instance of `registry`, destroying it afterwards.
///
/// Stops at the first failing step; the error names the step.
pub fn run_program(program: &Program, registry: &SimulatorRegistry) -> Result<ProgramOutcome> {
    check_limits(program, registry.limits())?;

    let sim = registry.create().context("Failed to create simulator instance")?;
    let outcome = drive(program, registry, sim);
    registry.destroy(sim)?;
    outcome
}

fn check_limits(program: &Program, limits: &LimitsConfig) -> Result<()> {
    if program.qubits > limits.max_qubits_per_instance {
        bail!(
            "Program allocates {} qubits but the limit is {}",
            program.qubits,
            limits.max_qubits_per_instance
        );
    }
    Ok(())
}

fn drive(
    program: &Program,
    registry: &SimulatorRegistry,
    sim: InstanceId,
) -> Result<ProgramOutcome> {
    let mut handles = registry
        .allocate_qubits(sim, program.qubits)
        .context("Failed to allocate initial qubits")?;
    let mut gates_applied = 0;

    for (index, step) in program.steps.iter().enumerate() {
        let number = index + 1;
        match step {
            Step::Allocate { allocate } => {
                let fresh = registry
                    .allocate_qubits(sim, *allocate)
                    .with_context(|| format!("step {number}: allocate {allocate}"))?;
                handles.extend(fresh);
            }
            Step::Release { release } => {
                let qubit = qubit_at(&handles, *release)
                    .with_context(|| format!("step {number}: release"))?;
                registry
                    .release_qubit(sim, &qubit)
                    .with_context(|| format!("step {number}: release qubit {release}"))?;
            }
            Step::Gate(gate_step) => {
                let op = operation(gate_step, &handles)
                    .with_context(|| format!("step {number}: {}", gate_step.gate))?;
                registry
                    .apply(sim, &op)
                    .with_context(|| format!("step {number}: {}", op.gate()))?;
                gates_applied += 1;
            }
        }
        debug!(step = number, "program step done");
    }

    let live_qubits = registry.qubit_count(sim)?;
    let state = registry.dump(sim).ok();
    Ok(ProgramOutcome {
        gates_applied,
        live_qubits,
        state,
    })
}

fn qubit_at(handles: &[Qubit], index: usize) -> Result<Qubit> {
    match handles.get(index) {
        Some(q) => Ok(*q),
        None => bail!(
            "qubit index {index} out of range ({} allocated)",
            handles.len()
        ),
    }
}

fn operation(step: &GateStep, handles: &[Qubit]) -> Result<GateOperation> {
    let gate = step.to_gate()?;
    let targets = step
        .targets
        .iter()
        .map(|&i| qubit_at(handles, i))
        .collect::<Result<Vec<_>>>()?;
    let controls = step
        .controls
        .iter()
        .map(|&i| qubit_at(handles, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(GateOperation::new(gate, targets).controlled_by(controls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramFormat;
    use arvak_qsim::{QsimError, RecordingBackend};
    use std::sync::Arc;

    fn program(yaml: &str) -> Program {
        Program::parse(yaml, ProgramFormat::Yaml).unwrap()
    }

    fn trace_registry() -> (Arc<RecordingBackend>, SimulatorRegistry) {
        let backend = Arc::new(RecordingBackend::new());
        let registry = SimulatorRegistry::new(backend.clone());
        (backend, registry)
    }

    #[test]
    fn test_run_records_calls() {
        let (backend, registry) = trace_registry();
        let p = program(
            "qubits: 2\nsteps:\n  - gate: h\n    targets: [0]\n  - gate: x\n    controls: [0]\n    targets: [1]\n",
        );
        let outcome = run_program(&p, &registry).unwrap();
        assert_eq!(outcome.gates_applied, 2);
        assert_eq!(outcome.live_qubits, 2);
        assert!(outcome.state.is_none());

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].controls.len(), 1);
        assert!(registry.live_instances().is_empty());
    }

    #[test]
    fn test_run_reports_failing_step() {
        let (backend, registry) = trace_registry();
        let p = program(
            "qubits: 1\nsteps:\n  - gate: x\n    targets: [0]\n  - gate: h\n    controls: [0]\n    targets: [0]\n",
        );
        let err = run_program(&p, &registry).unwrap_err();
        assert!(format!("{err:#}").contains("step 2"));
        assert!(matches!(
            err.downcast_ref::<QsimError>(),
            Some(QsimError::QubitUniqueness { .. })
        ));
        assert_eq!(backend.call_count(), 1);
        // The instance is destroyed even on failure.
        assert!(registry.live_instances().is_empty());
    }

    #[test]
    fn test_released_index_cannot_be_used() {
        let (_, registry) = trace_registry();
        let p = program(
            "qubits: 2\nsteps:\n  - release: 0\n  - allocate: 1\n  - gate: x\n    targets: [0]\n",
        );
        let err = run_program(&p, &registry).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QsimError>(),
            Some(QsimError::InvalidQubit { .. })
        ));
    }

    #[test]
    fn test_reallocated_qubit_gets_new_index() {
        let (backend, registry) = trace_registry();
        let p = program(
            "qubits: 2\nsteps:\n  - release: 0\n  - allocate: 1\n  - gate: x\n    targets: [2]\n",
        );
        let outcome = run_program(&p, &registry).unwrap();
        assert_eq!(outcome.live_qubits, 2);
        // The backend reused id 0 for the new handle.
        assert_eq!(backend.calls()[0].targets[0].0, 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let (_, registry) = trace_registry();
        let p = program("qubits: 1\nsteps:\n  - gate: x\n    targets: [3]\n");
        let err = run_program(&p, &registry).unwrap_err();
        assert!(format!("{err:#}").contains("out of range"));
    }

    #[test]
    fn test_program_over_qubit_limit() {
        let (_, registry) = trace_registry();
        let p = program("qubits: 1000\n");
        assert!(run_program(&p, &registry).is_err());
        assert!(registry.live_instances().is_empty());
    }
}
