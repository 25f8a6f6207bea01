//! A backend that records invocations instead of evolving a state.
//!
//! Qubit ids are issued lowest-free-first per instance, so released ids are
//! reused the same way a statevector backend reuses them.

use rustc_hash::FxHashMap;
use std::sync::Mutex;
use tracing::trace;

use crate::backend::{BackendError, BackendResult, GateCall, QuantumBackend};
use crate::gate::Gate;
use crate::qubit::{BackendId, QubitId};

/// A gate invocation observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Backend state the call targeted.
    pub instance: BackendId,
    /// The gate.
    pub gate: Gate,
    /// Control qubit ids, empty when uncontrolled.
    pub controls: Vec<QubitId>,
    /// Target qubit ids.
    pub targets: Vec<QubitId>,
}

/// Lifecycle calls observed by [`RecordingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `create` returned this id.
    Created(BackendId),
    /// `destroy` was called.
    Destroyed(BackendId),
    /// `allocate_qubit` returned this qubit.
    Allocated(BackendId, QubitId),
    /// `release_qubit` was called.
    Released(BackendId, QubitId),
}

#[derive(Default)]
struct RecordingState {
    next_id: u32,
    /// Per instance: slot `i` is true while qubit id `i` is allocated.
    instances: FxHashMap<BackendId, Vec<bool>>,
    calls: Vec<RecordedCall>,
    events: Vec<LifecycleEvent>,
}

/// Backend that keeps a log of everything it is asked to do.
#[derive(Default)]
pub struct RecordingBackend {
    state: Mutex<RecordingState>,
    max_instances: Option<usize>,
    max_qubits: Option<usize>,
}

impl RecordingBackend {
    /// Create a recording backend without capacity limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create more than `max` live instances.
    #[must_use]
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }

    /// Refuse to allocate more than `max` live qubits per instance.
    #[must_use]
    pub fn with_max_qubits(mut self, max: usize) -> Self {
        self.max_qubits = Some(max);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every gate invocation so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Gate invocations against one backend id.
    pub fn calls_for(&self, id: BackendId) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.instance == id)
            .cloned()
            .collect()
    }

    /// Number of gate invocations so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Every lifecycle call so far, in call order.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.lock().events.clone()
    }

    /// Number of live instances.
    pub fn live_instances(&self) -> usize {
        self.lock().instances.len()
    }

    /// Forget recorded calls and events. Live instances are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.events.clear();
    }
}

impl QuantumBackend for RecordingBackend {
    fn name(&self) -> &str {
        "trace"
    }

    fn create(&self) -> BackendResult<BackendId> {
        let mut state = self.lock();
        if let Some(max) = self.max_instances {
            if state.instances.len() >= max {
                return Err(BackendError::Exhausted(format!(
                    "recording backend holds {max} instances"
                )));
            }
        }
        let id = BackendId(state.next_id);
        state.next_id += 1;
        state.instances.insert(id, Vec::new());
        state.events.push(LifecycleEvent::Created(id));
        trace!(%id, "recording: create");
        Ok(id)
    }

    fn destroy(&self, id: BackendId) -> BackendResult<()> {
        let mut state = self.lock();
        state
            .instances
            .remove(&id)
            .ok_or(BackendError::UnknownInstance(id))?;
        state.events.push(LifecycleEvent::Destroyed(id));
        Ok(())
    }

    fn allocate_qubit(&self, id: BackendId) -> BackendResult<QubitId> {
        let mut state = self.lock();
        let slots = state
            .instances
            .get_mut(&id)
            .ok_or(BackendError::UnknownInstance(id))?;
        let live = slots.iter().filter(|used| **used).count();
        if let Some(max) = self.max_qubits {
            if live >= max {
                return Err(BackendError::Exhausted(format!(
                    "recording backend instance {id} holds {max} qubits"
                )));
            }
        }
        let slot = match slots.iter().position(|used| !used) {
            Some(free) => {
                slots[free] = true;
                free
            }
            None => {
                slots.push(true);
                slots.len() - 1
            }
        };
        let qubit = QubitId(slot as u32);
        state.events.push(LifecycleEvent::Allocated(id, qubit));
        Ok(qubit)
    }

    fn release_qubit(&self, id: BackendId, qubit: QubitId) -> BackendResult<()> {
        let mut state = self.lock();
        let slots = state
            .instances
            .get_mut(&id)
            .ok_or(BackendError::UnknownInstance(id))?;
        match slots.get_mut(qubit.0 as usize) {
            Some(used) if *used => *used = false,
            _ => {
                return Err(BackendError::Failed(format!(
                    "qubit {qubit} is not allocated on {id}"
                )));
            }
        }
        state.events.push(LifecycleEvent::Released(id, qubit));
        Ok(())
    }

    fn apply(&self, call: &GateCall<'_>) -> BackendResult<()> {
        let mut state = self.lock();
        if !state.instances.contains_key(&call.instance) {
            return Err(BackendError::UnknownInstance(call.instance));
        }
        trace!(gate = %call.gate, "recording: apply");
        state.calls.push(RecordedCall {
            instance: call.instance,
            gate: call.gate.clone(),
            controls: call.controls.to_vec(),
            targets: call.targets.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_free_id_is_reused() {
        let backend = RecordingBackend::new();
        let id = backend.create().unwrap();
        let q0 = backend.allocate_qubit(id).unwrap();
        let q1 = backend.allocate_qubit(id).unwrap();
        let q2 = backend.allocate_qubit(id).unwrap();
        assert_eq!((q0, q1, q2), (QubitId(0), QubitId(1), QubitId(2)));

        backend.release_qubit(id, q1).unwrap();
        assert_eq!(backend.allocate_qubit(id).unwrap(), QubitId(1));
        assert_eq!(backend.allocate_qubit(id).unwrap(), QubitId(3));
    }

    #[test]
    fn test_instance_capacity() {
        let backend = RecordingBackend::new().with_max_instances(1);
        let id = backend.create().unwrap();
        assert!(matches!(backend.create(), Err(BackendError::Exhausted(_))));
        backend.destroy(id).unwrap();
        assert!(backend.create().is_ok());
    }

    #[test]
    fn test_qubit_capacity() {
        let backend = RecordingBackend::new().with_max_qubits(1);
        let id = backend.create().unwrap();
        backend.allocate_qubit(id).unwrap();
        assert!(matches!(
            backend.allocate_qubit(id),
            Err(BackendError::Exhausted(_))
        ));
    }

    #[test]
    fn test_records_calls() {
        let backend = RecordingBackend::new();
        let id = backend.create().unwrap();
        let gate = Gate::H;
        backend
            .apply(&GateCall {
                instance: id,
                gate: &gate,
                controls: &[QubitId(1)],
                targets: &[QubitId(0)],
            })
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].gate, Gate::H);
        assert_eq!(calls[0].controls, vec![QubitId(1)]);
        assert_eq!(calls[0].targets, vec![QubitId(0)]);
    }

    #[test]
    fn test_unknown_instance() {
        let backend = RecordingBackend::new();
        assert_eq!(
            backend.destroy(BackendId(9)),
            Err(BackendError::UnknownInstance(BackendId(9)))
        );
    }
}
