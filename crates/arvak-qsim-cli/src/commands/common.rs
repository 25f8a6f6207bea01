//! Shared helpers for CLI commands.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use console::style;

use arvak_adapter_qsim::StatevectorBackend;
use arvak_qsim::{
    BackendKind, QsimConfig, QuantumBackend, RecordedCall, RecordingBackend, StateDump,
};

/// Number of basis states shown in the state table.
const MAX_ROWS: usize = 16;

/// The backend a command runs against.
///
/// Kept concrete so commands can reach backend-specific output such as the
/// recorded call log.
pub enum BackendHandle {
    Statevector(Arc<StatevectorBackend>),
    Trace(Arc<RecordingBackend>),
}

impl BackendHandle {
    /// Build the backend for `kind`, sized from `config`.
    pub fn new(kind: BackendKind, config: &QsimConfig) -> Self {
        match kind {
            BackendKind::Statevector => {
                BackendHandle::Statevector(Arc::new(StatevectorBackend::from_config(config)))
            }
            BackendKind::Trace => BackendHandle::Trace(Arc::new(
                RecordingBackend::new().with_max_instances(config.limits.max_instances),
            )),
        }
    }

    /// The backend as a trait object.
    pub fn backend(&self) -> Arc<dyn QuantumBackend> {
        match self {
            BackendHandle::Statevector(b) => b.clone(),
            BackendHandle::Trace(b) => b.clone(),
        }
    }

    /// Recorded invocations, for the trace backend.
    pub fn recorded_calls(&self) -> Option<Vec<RecordedCall>> {
        match self {
            BackendHandle::Statevector(_) => None,
            BackendHandle::Trace(b) => Some(b.calls()),
        }
    }
}

/// Resolve the backend kind from a `--backend` flag or the configuration.
pub fn backend_kind(flag: Option<&str>, config: &QsimConfig) -> Result<BackendKind> {
    match flag {
        Some(name) => name
            .parse()
            .map_err(|e| anyhow!("{e}. Available: statevector, trace")),
        None => Ok(config.backend.kind),
    }
}

/// Print the non-negligible amplitudes of a state.
pub fn print_state(dump: &StateDump) {
    println!(
        "\n{} State ({} qubits):",
        style("✓").green().bold(),
        dump.qubits.len()
    );

    let mut rows: Vec<(usize, f64)> = dump
        .probabilities()
        .into_iter()
        .enumerate()
        .filter(|(_, p)| *p > 1e-12)
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for &(index, prob) in rows.iter().take(MAX_ROWS) {
        let amp = dump.amplitudes[index];
        let bar: String = "█".repeat((prob * 50.0).round() as usize);
        println!(
            "  |{}⟩: {:>+.4}{:+.4}i ({:>6.2}%) {}",
            style(dump.basis_label(index)).cyan(),
            amp.re,
            amp.im,
            prob * 100.0,
            style(bar).green()
        );
    }

    if rows.len() > MAX_ROWS {
        println!("  ... and {} more basis states", rows.len() - MAX_ROWS);
    }

    let order: Vec<String> = dump.qubits.iter().rev().map(ToString::to_string).collect();
    println!("\n  Bit order: {}", style(order.join(" ")).dim());
}
