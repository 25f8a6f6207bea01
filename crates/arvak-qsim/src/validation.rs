//! Qubit and parameter validation.
//!
//! All checks are pure: they read their inputs, never mutate anything, and
//! return the same outcome when repeated. Gate dispatch runs them before the
//! backend sees an invocation.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{InvalidQubitReason, QsimError, QsimResult};
use crate::gate::{Gate, GateOperation, ParametrizedGate};
use crate::qubit::{InstanceId, Qubit, QubitId};

/// Read-only view of an instance's live qubits.
pub trait LiveQubits {
    /// Allocation serial of the live qubit with this id, if any.
    fn serial_of(&self, id: QubitId) -> Option<u64>;
}

impl LiveQubits for FxHashMap<QubitId, u64> {
    fn serial_of(&self, id: QubitId) -> Option<u64> {
        self.get(&id).copied()
    }
}

/// Check that `qubit` belongs to `instance` and is still allocated.
pub fn check_qubit(instance: InstanceId, live: &impl LiveQubits, qubit: &Qubit) -> QsimResult<()> {
    if qubit.instance() != instance {
        return Err(QsimError::InvalidQubit {
            qubit: qubit.id(),
            instance,
            reason: InvalidQubitReason::ForeignInstance(qubit.instance()),
        });
    }
    match live.serial_of(qubit.id()) {
        Some(serial) if serial == qubit.serial() => Ok(()),
        _ => Err(QsimError::InvalidQubit {
            qubit: qubit.id(),
            instance,
            reason: InvalidQubitReason::Released,
        }),
    }
}

/// Check that no qubit id occurs twice in `qubits`.
///
/// The error lists every duplicated id once, in order of first occurrence.
pub fn check_uniqueness<'a>(qubits: impl IntoIterator<Item = &'a Qubit>) -> QsimResult<()> {
    let mut seen = FxHashSet::default();
    let mut duplicates: Vec<QubitId> = Vec::new();
    for q in qubits {
        if !seen.insert(q.id()) && !duplicates.contains(&q.id()) {
            duplicates.push(q.id());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(QsimError::QubitUniqueness {
            duplicates,
            gate: None,
        })
    }
}

/// Check a combined qubit sequence (controls followed by targets).
///
/// Uniqueness is checked first, then every qubit individually.
pub fn check_qubits<'a>(
    instance: InstanceId,
    live: &impl LiveQubits,
    qubits: impl IntoIterator<Item = &'a Qubit>,
) -> QsimResult<()> {
    let qubits: Vec<&Qubit> = qubits.into_iter().collect();
    check_uniqueness(qubits.iter().copied())?;
    for q in qubits {
        check_qubit(instance, live, q)?;
    }
    Ok(())
}

/// Reject NaN and infinite angles.
pub fn check_angle(gate: &str, angle: f64) -> QsimResult<()> {
    if angle.is_nan() {
        return Err(QsimError::InvalidParameter {
            gate: gate.to_string(),
            value: angle,
            reason: "angle is NaN",
        });
    }
    if angle.is_infinite() {
        return Err(QsimError::InvalidParameter {
            gate: gate.to_string(),
            value: angle,
            reason: "angle is infinite",
        });
    }
    Ok(())
}

/// Gate-specific parameter contract.
pub fn check_gate_parameters(gate: &Gate) -> QsimResult<()> {
    match gate {
        Gate::Fixed(_) => Ok(()),
        Gate::Parametrized(ParametrizedGate::Exp(paulis, _)) if paulis.is_empty() => {
            Err(QsimError::InvalidOperation {
                gate: gate.name().to_string(),
                message: "at least one Pauli operator is required".to_string(),
            })
        }
        Gate::Parametrized(g) => check_angle(g.name(), g.angle()),
    }
}

/// Check that the operation supplies as many targets as the gate acts on.
pub fn check_arity(op: &GateOperation) -> QsimResult<()> {
    let expected = op.gate().num_targets();
    let got = op.targets().len();
    if expected != got {
        return Err(QsimError::InvalidOperation {
            gate: op.gate().name().to_string(),
            message: format!("expected {expected} target qubit(s), got {got}"),
        });
    }
    Ok(())
}
