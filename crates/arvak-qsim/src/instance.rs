//! Per-instance control state.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::backend::{BackendError, QuantumBackend};
use crate::dispatch::dispatch;
use crate::error::{QsimError, QsimResult};
use crate::gate::GateOperation;
use crate::qubit::{BackendId, InstanceId, Qubit, QubitId};
use crate::validation::{LiveQubits, check_qubit};

/// One simulation session.
///
/// Holds no amplitudes. The numeric state lives in the backend under
/// `backend_id`; this side only tracks which qubit handles are live.
#[derive(Debug)]
pub struct SimulatorInstance {
    id: InstanceId,
    backend_id: BackendId,
    /// Live qubit id -> allocation serial of its current handle.
    qubits: FxHashMap<QubitId, u64>,
    next_serial: u64,
    max_qubits: Option<usize>,
    destroyed: bool,
}

impl SimulatorInstance {
    pub(crate) fn new(id: InstanceId, backend_id: BackendId, max_qubits: Option<usize>) -> Self {
        Self {
            id,
            backend_id,
            qubits: FxHashMap::default(),
            next_serial: 0,
            max_qubits,
            destroyed: false,
        }
    }

    /// Registry handle of this instance.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Backend id of this instance's state.
    pub fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    /// Number of live qubits.
    pub fn qubit_count(&self) -> usize {
        self.qubits.len()
    }

    /// Handles of all live qubits, ordered by id.
    pub fn live_qubits(&self) -> Vec<Qubit> {
        let mut qubits: Vec<Qubit> = self
            .qubits
            .iter()
            .map(|(&id, &serial)| Qubit::new(id, self.id, serial))
            .collect();
        qubits.sort_by_key(Qubit::id);
        qubits
    }

    /// Ask the backend for one more qubit.
    pub(crate) fn allocate_qubit(&mut self, backend: &dyn QuantumBackend) -> QsimResult<Qubit> {
        if let Some(max) = self.max_qubits {
            if self.qubits.len() >= max {
                return Err(QsimError::ResourceExhausted(format!(
                    "instance {} already holds {max} qubits",
                    self.id
                )));
            }
        }

        let id = backend.allocate_qubit(self.backend_id)?;
        if self.qubits.contains_key(&id) {
            // Hand the qubit back so the backend's register shrinks again.
            if let Err(err) = backend.release_qubit(self.backend_id, id) {
                warn!(
                    instance = %self.id,
                    qubit = %id,
                    error = %err,
                    "failed to hand back duplicate qubit"
                );
            }
            return Err(QsimError::Backend(BackendError::Failed(format!(
                "backend returned live qubit id {id} for instance {}",
                self.id
            ))));
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        self.qubits.insert(id, serial);
        debug!(instance = %self.id, qubit = %id, serial, "allocated qubit");
        Ok(Qubit::new(id, self.id, serial))
    }

    /// Release `qubit`. The handle stays live if the backend refuses.
    pub(crate) fn release_qubit(
        &mut self,
        backend: &dyn QuantumBackend,
        qubit: &Qubit,
    ) -> QsimResult<()> {
        check_qubit(self.id, &*self, qubit)?;
        backend.release_qubit(self.backend_id, qubit.id())?;
        self.qubits.remove(&qubit.id());
        debug!(instance = %self.id, qubit = %qubit.id(), "released qubit");
        Ok(())
    }

    /// Validate and apply one gate operation.
    pub(crate) fn apply(&self, backend: &dyn QuantumBackend, op: &GateOperation) -> QsimResult<()> {
        dispatch(backend, self, op)
    }

    /// Check if the backend state has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Drop every qubit handle. Used when the backend state is destroyed.
    pub(crate) fn invalidate(&mut self) {
        self.qubits.clear();
        self.destroyed = true;
    }
}

impl LiveQubits for SimulatorInstance {
    fn serial_of(&self, id: QubitId) -> Option<u64> {
        self.qubits.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use crate::backend::{BackendResult, GateCall};
    use crate::recording::RecordingBackend;
    use std::sync::Mutex;

    /// Hands out qubit 0 on every allocation.
    #[derive(Default)]
    struct StuckBackend {
        released: Mutex<Vec<QubitId>>,
    }

    impl QuantumBackend for StuckBackend {
        fn name(&self) -> &str {
            "stuck"
        }

        fn create(&self) -> BackendResult<BackendId> {
            Ok(BackendId(0))
        }

        fn destroy(&self, _id: BackendId) -> BackendResult<()> {
            Ok(())
        }

        fn allocate_qubit(&self, _id: BackendId) -> BackendResult<QubitId> {
            Ok(QubitId(0))
        }

        fn release_qubit(&self, _id: BackendId, qubit: QubitId) -> BackendResult<()> {
            self.released.lock().unwrap().push(qubit);
            Ok(())
        }

        fn apply(&self, _call: &GateCall<'_>) -> BackendResult<()> {
            Ok(())
        }
    }

    fn instance(backend: &RecordingBackend, max_qubits: Option<usize>) -> SimulatorInstance {
        let backend_id = backend.create().unwrap();
        SimulatorInstance::new(InstanceId(0), backend_id, max_qubits)
    }

    #[test]
    fn test_allocate_and_release() {
        let backend = RecordingBackend::new();
        let mut inst = instance(&backend, None);

        let q0 = inst.allocate_qubit(&backend).unwrap();
        let q1 = inst.allocate_qubit(&backend).unwrap();
        assert_eq!(inst.qubit_count(), 2);
        assert_ne!(q0.id(), q1.id());

        inst.release_qubit(&backend, &q0).unwrap();
        assert_eq!(inst.qubit_count(), 1);
        assert!(matches!(
            inst.release_qubit(&backend, &q0),
            Err(QsimError::InvalidQubit { .. })
        ));
    }

    #[test]
    fn test_reused_id_does_not_revive_old_handle() {
        let backend = RecordingBackend::new();
        let mut inst = instance(&backend, None);

        let old = inst.allocate_qubit(&backend).unwrap();
        inst.release_qubit(&backend, &old).unwrap();
        let new = inst.allocate_qubit(&backend).unwrap();
        assert_eq!(old.id(), new.id());

        let op = GateOperation::single(Gate::X, old);
        assert!(matches!(
            inst.apply(&backend, &op),
            Err(QsimError::InvalidQubit { .. })
        ));
        assert!(inst.apply(&backend, &GateOperation::single(Gate::X, new)).is_ok());
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_qubit_limit() {
        let backend = RecordingBackend::new();
        let mut inst = instance(&backend, Some(1));
        inst.allocate_qubit(&backend).unwrap();
        assert!(matches!(
            inst.allocate_qubit(&backend),
            Err(QsimError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_live_qubits_sorted() {
        let backend = RecordingBackend::new();
        let mut inst = instance(&backend, None);
        for _ in 0..4 {
            inst.allocate_qubit(&backend).unwrap();
        }
        let ids: Vec<_> = inst.live_qubits().iter().map(Qubit::id).collect();
        assert_eq!(ids, vec![QubitId(0), QubitId(1), QubitId(2), QubitId(3)]);
    }

    #[test]
    fn test_duplicate_backend_id_is_handed_back() {
        let backend = StuckBackend::default();
        let mut inst = SimulatorInstance::new(InstanceId(0), BackendId(0), None);

        let q = inst.allocate_qubit(&backend).unwrap();
        assert!(matches!(
            inst.allocate_qubit(&backend),
            Err(QsimError::Backend(BackendError::Failed(_)))
        ));
        assert_eq!(*backend.released.lock().unwrap(), vec![QubitId(0)]);
        assert_eq!(inst.live_qubits(), vec![q]);
    }
}
