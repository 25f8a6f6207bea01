//! Error types for the simulator control layer.

use thiserror::Error;

use crate::backend::BackendError;
use crate::qubit::{InstanceId, QubitId};

/// Errors surfaced by the control layer.
///
/// Every variant except [`QsimError::Backend`] is detected before the backend
/// is invoked, so the instance state is unchanged when one of them is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QsimError {
    /// Qubit handle is unknown, released, or owned by another instance.
    #[error("Invalid qubit {qubit} on instance {instance}: {reason}")]
    InvalidQubit {
        /// The offending qubit id.
        qubit: QubitId,
        /// The instance the operation was issued against.
        instance: InstanceId,
        /// Why the handle was rejected.
        reason: InvalidQubitReason,
    },

    /// A qubit id occurs more than once in the combined control/target set.
    #[error("Qubits must be distinct, duplicated: {}{}", format_qubits(.duplicates), format_gate_context(.gate))]
    QubitUniqueness {
        /// Every id that occurs more than once, in first-occurrence order.
        duplicates: Vec<QubitId>,
        /// Optional gate name for context.
        gate: Option<String>,
    },

    /// A numeric gate parameter is NaN, infinite or outside the gate's domain.
    #[error("Invalid parameter for gate '{gate}': {value} ({reason})")]
    InvalidParameter {
        /// Name of the gate the parameter belongs to.
        gate: String,
        /// The rejected value.
        value: f64,
        /// What the value violated.
        reason: &'static str,
    },

    /// Operation issued against a destroyed or unknown instance.
    #[error("Invalid simulator instance: {0}")]
    InvalidInstance(InstanceId),

    /// The backend or a configured limit refuses further allocation.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Gate operation is malformed (wrong number of targets, empty Pauli list).
    #[error("Invalid operation for gate '{gate}': {message}")]
    InvalidOperation {
        /// Name of the gate.
        gate: String,
        /// What is wrong with the operation.
        message: String,
    },

    /// The backend failed after validation passed.
    #[error("Backend error: {0}")]
    Backend(BackendError),
}

/// Reason attached to [`QsimError::InvalidQubit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidQubitReason {
    /// The handle was issued by a different instance.
    ForeignInstance(InstanceId),
    /// The handle has been released (or its id was since reused).
    Released,
}

impl std::fmt::Display for InvalidQubitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidQubitReason::ForeignInstance(owner) => {
                write!(f, "qubit belongs to instance {owner}")
            }
            InvalidQubitReason::Released => write!(f, "qubit has been released"),
        }
    }
}

impl From<BackendError> for QsimError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Exhausted(msg) => QsimError::ResourceExhausted(msg),
            other => QsimError::Backend(other),
        }
    }
}

impl QsimError {
    /// Returns true if the error was raised before the backend was touched.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            QsimError::InvalidQubit { .. }
                | QsimError::QubitUniqueness { .. }
                | QsimError::InvalidParameter { .. }
                | QsimError::InvalidInstance(_)
                | QsimError::InvalidOperation { .. }
        )
    }
}

fn format_qubits(qubits: &[QubitId]) -> String {
    qubits
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate: &Option<String>) -> String {
    match gate {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for control layer operations.
pub type QsimResult<T> = Result<T, QsimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniqueness_message_names_duplicates() {
        let err = QsimError::QubitUniqueness {
            duplicates: vec![QubitId(0), QubitId(3)],
            gate: Some("h".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("q0, q3"));
        assert!(msg.contains("(gate: h)"));
    }

    #[test]
    fn test_parameter_message_names_value() {
        let err = QsimError::InvalidParameter {
            gate: "rx".into(),
            value: f64::INFINITY,
            reason: "angle must be finite",
        };
        assert!(err.to_string().contains("inf"));
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_backend_exhaustion_maps_to_resource_exhausted() {
        let err: QsimError = BackendError::Exhausted("no slots".into()).into();
        assert!(matches!(err, QsimError::ResourceExhausted(_)));

        let err: QsimError = BackendError::Failed("boom".into()).into();
        assert!(matches!(err, QsimError::Backend(_)));
        assert!(!err.is_validation_error());
    }
}
