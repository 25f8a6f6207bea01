//! Numerical backend contract.
//!
//! The backend owns every amplitude; the control layer only ever refers to a
//! state through its [`BackendId`]. Backends may assume their inputs were
//! validated: ids are live, qubit sets are duplicate-free, angles are finite.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gate::Gate;
use crate::qubit::{BackendId, QubitId};

/// Errors reported by a backend.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum BackendError {
    /// No capacity left for another instance or qubit.
    #[error("Backend capacity exhausted: {0}")]
    Exhausted(String),

    /// The backend has no state for this id.
    #[error("Unknown backend instance {0}")]
    UnknownInstance(BackendId),

    /// The backend does not implement this operation.
    #[error("Unsupported by backend: {0}")]
    Unsupported(String),

    /// Generic backend failure.
    #[error("{0}")]
    Failed(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// One gate invocation, as handed to the backend.
///
/// Uncontrolled invocations carry an empty `controls` slice; the parameter,
/// if any, travels inside the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateCall<'a> {
    /// Backend state to mutate.
    pub instance: BackendId,
    /// The gate to apply.
    pub gate: &'a Gate,
    /// Control qubit ids.
    pub controls: &'a [QubitId],
    /// Target qubit ids.
    pub targets: &'a [QubitId],
}

/// Snapshot of a backend state.
///
/// Bit `i` of an amplitude's index is the value of `qubits[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDump {
    /// Qubit ids in bit order.
    pub qubits: Vec<QubitId>,
    /// The amplitudes, `2^qubits.len()` of them.
    pub amplitudes: Vec<Complex64>,
}

impl StateDump {
    /// Probability of each basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Basis-state label for an index, most significant qubit first.
    pub fn basis_label(&self, index: usize) -> String {
        (0..self.qubits.len())
            .rev()
            .map(|bit| if (index >> bit) & 1 == 1 { '1' } else { '0' })
            .collect()
    }
}

/// Synchronous invocation interface of a numerical backend.
///
/// Calls against distinct instance ids may arrive concurrently from different
/// threads; calls against one id are serialized by the control layer.
pub trait QuantumBackend: Send + Sync {
    /// Name of this backend.
    fn name(&self) -> &str;

    /// Allocate a fresh state with zero qubits.
    fn create(&self) -> BackendResult<BackendId>;

    /// Release every resource held for `id`.
    fn destroy(&self, id: BackendId) -> BackendResult<()>;

    /// Grow the state by one qubit in |0⟩ and return its id.
    fn allocate_qubit(&self, id: BackendId) -> BackendResult<QubitId>;

    /// Remove a qubit from the state. Its id may be handed out again.
    fn release_qubit(&self, id: BackendId, qubit: QubitId) -> BackendResult<()>;

    /// Apply one gate invocation.
    fn apply(&self, call: &GateCall<'_>) -> BackendResult<()>;

    /// Snapshot the state. Backends without amplitude access don't override this.
    fn dump(&self, id: BackendId) -> BackendResult<StateDump> {
        let _ = id;
        Err(BackendError::Unsupported(format!(
            "state dump on backend '{}'",
            self.name()
        )))
    }
}
