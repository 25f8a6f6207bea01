//! Statevector backend implementation.

use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, trace};

use arvak_qsim::{
    BackendError, BackendId, BackendResult, GateCall, QsimConfig, QuantumBackend, QubitId,
    StateDump,
};

use crate::statevector::Statevector;

type StateSlot = Arc<Mutex<Statevector>>;

#[derive(Default)]
struct StateTable {
    next_id: u32,
    states: FxHashMap<BackendId, StateSlot>,
}

/// Local statevector backend.
///
/// Each backend id owns one [`Statevector`] behind its own lock, so distinct
/// ids can be driven from different threads at once. Memory per state grows
/// as 2^n in the number of live qubits, which is capped by `max_qubits`.
pub struct StatevectorBackend {
    table: Mutex<StateTable>,
    /// Maximum number of qubits per state.
    max_qubits: usize,
    /// Maximum number of live states.
    max_instances: Option<usize>,
}

impl StatevectorBackend {
    /// Create a new statevector backend with default settings.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(StateTable::default()),
            max_qubits: 24,
            max_instances: None,
        }
    }

    /// Create a backend sized from a control layer configuration.
    pub fn from_config(config: &QsimConfig) -> Self {
        Self::new()
            .with_max_qubits(config.backend.max_qubits)
            .with_max_instances(config.limits.max_instances)
    }

    /// Cap the number of qubits per state.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Cap the number of live states.
    #[must_use]
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = Some(max_instances);
        self
    }

    /// Maximum number of qubits per state.
    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    /// Number of live states.
    pub fn live_states(&self) -> usize {
        self.lock_table().states.len()
    }

    fn lock_table(&self) -> MutexGuard<'_, StateTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self, id: BackendId) -> BackendResult<StateSlot> {
        self.lock_table()
            .states
            .get(&id)
            .cloned()
            .ok_or(BackendError::UnknownInstance(id))
    }
}

impl Default for StatevectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_state(slot: &StateSlot) -> MutexGuard<'_, Statevector> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QuantumBackend for StatevectorBackend {
    fn name(&self) -> &str {
        "statevector"
    }

    fn create(&self) -> BackendResult<BackendId> {
        let mut table = self.lock_table();
        if let Some(max) = self.max_instances {
            if table.states.len() >= max {
                return Err(BackendError::Exhausted(format!(
                    "statevector backend holds {max} states"
                )));
            }
        }
        let id = BackendId(table.next_id);
        table.next_id = table
            .next_id
            .checked_add(1)
            .ok_or_else(|| BackendError::Exhausted("backend id space".to_string()))?;
        table
            .states
            .insert(id, Arc::new(Mutex::new(Statevector::new())));
        debug!(%id, "created statevector");
        Ok(id)
    }

    fn destroy(&self, id: BackendId) -> BackendResult<()> {
        self.lock_table()
            .states
            .remove(&id)
            .ok_or(BackendError::UnknownInstance(id))?;
        debug!(%id, "destroyed statevector");
        Ok(())
    }

    fn allocate_qubit(&self, id: BackendId) -> BackendResult<QubitId> {
        let slot = self.state(id)?;
        let mut sv = lock_state(&slot);
        if sv.num_qubits() >= self.max_qubits {
            return Err(BackendError::Exhausted(format!(
                "statevector {id} already holds {} qubits",
                self.max_qubits
            )));
        }
        let qubit = sv.allocate();
        trace!(%id, %qubit, num_qubits = sv.num_qubits(), "allocated qubit");
        Ok(qubit)
    }

    fn release_qubit(&self, id: BackendId, qubit: QubitId) -> BackendResult<()> {
        let slot = self.state(id)?;
        let mut sv = lock_state(&slot);
        sv.release(qubit)?;
        trace!(%id, %qubit, num_qubits = sv.num_qubits(), "released qubit");
        Ok(())
    }

    #[instrument(level = "trace", skip(self, call), fields(id = %call.instance, gate = %call.gate))]
    fn apply(&self, call: &GateCall<'_>) -> BackendResult<()> {
        let slot = self.state(call.instance)?;
        let mut sv = lock_state(&slot);
        sv.apply(call.gate, call.controls, call.targets)
    }

    fn dump(&self, id: BackendId) -> BackendResult<StateDump> {
        let slot = self.state(id)?;
        let sv = lock_state(&slot);
        Ok(sv.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arvak_qsim::Gate;

    #[test]
    fn test_lifecycle() {
        let backend = StatevectorBackend::new();
        let a = backend.create().unwrap();
        let b = backend.create().unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_states(), 2);

        backend.destroy(a).unwrap();
        assert_eq!(backend.live_states(), 1);
        assert!(matches!(
            backend.destroy(a),
            Err(BackendError::UnknownInstance(_))
        ));
    }

    #[test]
    fn test_qubit_cap() {
        let backend = StatevectorBackend::new().with_max_qubits(2);
        let id = backend.create().unwrap();
        backend.allocate_qubit(id).unwrap();
        backend.allocate_qubit(id).unwrap();
        assert!(matches!(
            backend.allocate_qubit(id),
            Err(BackendError::Exhausted(_))
        ));
    }

    #[test]
    fn test_instance_cap() {
        let backend = StatevectorBackend::new().with_max_instances(1);
        backend.create().unwrap();
        assert!(matches!(backend.create(), Err(BackendError::Exhausted(_))));
    }

    #[test]
    fn test_states_are_independent() {
        let backend = StatevectorBackend::new();
        let a = backend.create().unwrap();
        let b = backend.create().unwrap();
        let qa = backend.allocate_qubit(a).unwrap();
        let qb = backend.allocate_qubit(b).unwrap();

        backend
            .apply(&GateCall {
                instance: a,
                gate: &Gate::X,
                controls: &[],
                targets: &[qa],
            })
            .unwrap();

        assert_eq!(backend.dump(a).unwrap().probabilities(), vec![0.0, 1.0]);
        assert_eq!(backend.dump(b).unwrap().probabilities(), vec![1.0, 0.0]);
        assert_eq!(qa, qb);
    }

    #[test]
    fn test_from_config() {
        let mut config = QsimConfig::default();
        config.backend.max_qubits = 3;
        config.limits.max_instances = 2;
        let backend = StatevectorBackend::from_config(&config);
        assert_eq!(backend.max_qubits(), 3);
        backend.create().unwrap();
        backend.create().unwrap();
        assert!(backend.create().is_err());
    }
}
