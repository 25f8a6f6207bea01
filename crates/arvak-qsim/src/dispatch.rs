//! Gate dispatch: validate an operation, then issue one backend call.
//!
//! Every gate goes through the same path whether it is fixed or parametrized,
//! controlled or not. Controls only change the `controls` slice of the
//! [`GateCall`]; there is no per-gate controlled variant.

use tracing::debug;

use crate::backend::{GateCall, QuantumBackend};
use crate::error::{QsimError, QsimResult};
use crate::gate::GateOperation;
use crate::instance::SimulatorInstance;
use crate::qubit::{InstanceId, Qubit, QubitId};
use crate::validation::{
    LiveQubits, check_arity, check_gate_parameters, check_qubit, check_qubits,
};

/// Run every pre-dispatch check for `op` against an instance's live qubits.
///
/// When more than one qubit is involved (any controls, or a multi-target gate)
/// the combined controls-then-targets sequence must be duplicate-free;
/// otherwise the single target is checked on its own. Parameters are checked
/// after the qubits.
pub fn validate_operation(
    instance: InstanceId,
    live: &impl LiveQubits,
    op: &GateOperation,
) -> QsimResult<()> {
    check_arity(op)?;

    if op.is_controlled() || op.targets().len() > 1 {
        check_qubits(instance, live, op.qubits()).map_err(|err| match err {
            QsimError::QubitUniqueness { duplicates, .. } => QsimError::QubitUniqueness {
                duplicates,
                gate: Some(op.gate().name().to_string()),
            },
            other => other,
        })?;
    } else {
        for target in op.targets() {
            check_qubit(instance, live, target)?;
        }
    }

    check_gate_parameters(op.gate())
}

/// Validate `op` and hand it to the backend as exactly one invocation.
///
/// Nothing reaches the backend if validation fails.
pub(crate) fn dispatch(
    backend: &dyn QuantumBackend,
    instance: &SimulatorInstance,
    op: &GateOperation,
) -> QsimResult<()> {
    validate_operation(instance.id(), instance, op)?;

    let controls: Vec<QubitId> = op.controls().iter().map(Qubit::id).collect();
    let targets: Vec<QubitId> = op.targets().iter().map(Qubit::id).collect();
    let call = GateCall {
        instance: instance.backend_id(),
        gate: op.gate(),
        controls: &controls,
        targets: &targets,
    };

    debug!(
        instance = %instance.id(),
        gate = %op.gate(),
        controls = ?controls,
        targets = ?targets,
        "dispatching gate"
    );

    backend.apply(&call)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use rustc_hash::FxHashMap;

    fn setup() -> (FxHashMap<QubitId, u64>, Qubit, Qubit) {
        let mut live = FxHashMap::default();
        live.insert(QubitId(0), 0);
        live.insert(QubitId(1), 1);
        let q0 = Qubit::new(QubitId(0), InstanceId(1), 0);
        let q1 = Qubit::new(QubitId(1), InstanceId(1), 1);
        (live, q0, q1)
    }

    #[test]
    fn test_control_equal_to_target_is_rejected() {
        let (live, q0, _) = setup();
        let op = GateOperation::single(Gate::H, q0).controlled_by(vec![q0]);
        let err = validate_operation(InstanceId(1), &live, &op).unwrap_err();
        match err {
            QsimError::QubitUniqueness { duplicates, gate } => {
                assert_eq!(duplicates, vec![QubitId(0)]);
                assert_eq!(gate.as_deref(), Some("h"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_swap_targets_must_differ() {
        let (live, q0, _) = setup();
        let op = GateOperation::new(Gate::SWAP, vec![q0, q0]);
        assert!(matches!(
            validate_operation(InstanceId(1), &live, &op),
            Err(QsimError::QubitUniqueness { .. })
        ));
    }

    #[test]
    fn test_qubits_checked_before_parameters() {
        let (live, q0, _) = setup();
        let op = GateOperation::single(Gate::rx(f64::NAN), q0).controlled_by(vec![q0]);
        assert!(matches!(
            validate_operation(InstanceId(1), &live, &op),
            Err(QsimError::QubitUniqueness { .. })
        ));
    }

    #[test]
    fn test_valid_controlled_rotation() {
        let (live, q0, q1) = setup();
        let op = GateOperation::single(Gate::ry(1.0), q0).controlled_by(vec![q1]);
        assert!(validate_operation(InstanceId(1), &live, &op).is_ok());
    }
}
