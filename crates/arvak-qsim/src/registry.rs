//! Registry of live simulator instances.
//!
//! The [`SimulatorRegistry`] is the process-scoped owner of every instance:
//! empty when constructed, emptied again by [`SimulatorRegistry::shutdown`]
//! (or on drop). It routes each call to the right instance and backend state.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::backend::{QuantumBackend, StateDump};
use crate::config::LimitsConfig;
use crate::error::{QsimError, QsimResult};
use crate::gate::{Gate, GateOperation};
use crate::instance::SimulatorInstance;
use crate::qubit::{InstanceId, Qubit};

type InstanceSlot = Arc<Mutex<SimulatorInstance>>;

/// Shared by every registry in the process, so a handle issued by one
/// registry can never name an instance of another.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Central registry for simulator instances.
///
/// The instance map sits behind a `RwLock`; each instance has its own
/// `Mutex`. Calls against one instance are serialized, calls against distinct
/// instances proceed in parallel.
pub struct SimulatorRegistry {
    backend: Arc<dyn QuantumBackend>,
    instances: RwLock<FxHashMap<InstanceId, InstanceSlot>>,
    limits: LimitsConfig,
}

impl SimulatorRegistry {
    /// Create an empty registry with default limits.
    pub fn new(backend: Arc<dyn QuantumBackend>) -> Self {
        Self::with_limits(backend, LimitsConfig::default())
    }

    /// Create an empty registry with explicit limits.
    pub fn with_limits(backend: Arc<dyn QuantumBackend>, limits: LimitsConfig) -> Self {
        debug!(
            backend = backend.name(),
            max_instances = limits.max_instances,
            max_qubits = limits.max_qubits_per_instance,
            "creating simulator registry"
        );
        Self {
            backend,
            instances: RwLock::new(FxHashMap::default()),
            limits,
        }
    }

    /// Name of the backend this registry drives.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// The limits in force.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Start a new simulation session with zero qubits.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self) -> QsimResult<InstanceId> {
        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if instances.len() >= self.limits.max_instances {
            return Err(QsimError::ResourceExhausted(format!(
                "registry already holds {} instances",
                self.limits.max_instances
            )));
        }

        let backend_id = self.backend.create()?;
        let id = InstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed));
        let instance =
            SimulatorInstance::new(id, backend_id, Some(self.limits.max_qubits_per_instance));
        instances.insert(id, Arc::new(Mutex::new(instance)));

        info!(instance = %id, backend_id = %backend_id, "created simulator instance");
        Ok(id)
    }

    /// End a session and release its backend state.
    ///
    /// Every later call naming `id`, or using one of its qubits, fails with
    /// [`QsimError::InvalidInstance`]. If the backend refuses, the instance
    /// stays registered and live so the call can be retried.
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&self, id: InstanceId) -> QsimResult<()> {
        let slot = self.slot(id)?;
        let mut instance = lock_instance(&slot);
        if instance.is_destroyed() {
            return Err(QsimError::InvalidInstance(id));
        }

        if let Err(err) = self.backend.destroy(instance.backend_id()) {
            warn!(instance = %id, error = %err, "backend failed to destroy instance");
            return Err(err.into());
        }
        instance.invalidate();
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        info!(instance = %id, "destroyed simulator instance");
        Ok(())
    }

    /// Allocate one qubit on `id`.
    pub fn allocate_qubit(&self, id: InstanceId) -> QsimResult<Qubit> {
        self.with_instance(id, |instance| instance.allocate_qubit(self.backend.as_ref()))
    }

    /// Allocate `n` qubits on `id`, all or nothing.
    pub fn allocate_qubits(&self, id: InstanceId, n: usize) -> QsimResult<Vec<Qubit>> {
        self.with_instance(id, |instance| {
            let mut qubits = Vec::with_capacity(n);
            for _ in 0..n {
                match instance.allocate_qubit(self.backend.as_ref()) {
                    Ok(q) => qubits.push(q),
                    Err(err) => {
                        // Fresh qubits are in |0⟩, so handing them back cannot fail
                        // on state grounds.
                        for q in qubits.iter().rev() {
                            if let Err(release_err) =
                                instance.release_qubit(self.backend.as_ref(), q)
                            {
                                warn!(qubit = %q, error = %release_err, "rollback release failed");
                            }
                        }
                        return Err(err);
                    }
                }
            }
            Ok(qubits)
        })
    }

    /// Release `qubit` from instance `id`.
    pub fn release_qubit(&self, id: InstanceId, qubit: &Qubit) -> QsimResult<()> {
        self.with_instance(id, |instance| {
            instance.release_qubit(self.backend.as_ref(), qubit)
        })
    }

    /// Validate and apply a gate operation on instance `id`.
    #[instrument(level = "debug", skip(self, op), fields(gate = %op.gate()))]
    pub fn apply(&self, id: InstanceId, op: &GateOperation) -> QsimResult<()> {
        self.with_instance(id, |instance| instance.apply(self.backend.as_ref(), op))
    }

    /// Apply an uncontrolled single-target gate.
    pub fn apply_gate(
        &self,
        id: InstanceId,
        gate: impl Into<Gate>,
        target: Qubit,
    ) -> QsimResult<()> {
        self.apply(id, &GateOperation::single(gate, target))
    }

    /// Apply a single-target gate under `controls`.
    ///
    /// With an empty `controls` slice this is exactly [`Self::apply_gate`].
    pub fn apply_controlled(
        &self,
        id: InstanceId,
        controls: &[Qubit],
        gate: impl Into<Gate>,
        target: Qubit,
    ) -> QsimResult<()> {
        self.apply(
            id,
            &GateOperation::single(gate, target).controlled_by(controls.to_vec()),
        )
    }

    /// Number of live qubits on `id`.
    pub fn qubit_count(&self, id: InstanceId) -> QsimResult<usize> {
        self.with_instance(id, |instance| Ok(instance.qubit_count()))
    }

    /// Handles of the live qubits on `id`, ordered by qubit id.
    pub fn live_qubits(&self, id: InstanceId) -> QsimResult<Vec<Qubit>> {
        self.with_instance(id, |instance| Ok(instance.live_qubits()))
    }

    /// Snapshot the backend state of `id`.
    pub fn dump(&self, id: InstanceId) -> QsimResult<StateDump> {
        self.with_instance(id, |instance| {
            Ok(self.backend.dump(instance.backend_id())?)
        })
    }

    /// Ids of all live instances, ascending.
    pub fn live_instances(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Check if `id` names a live instance.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Destroy every live instance. Returns how many were destroyed.
    ///
    /// Backend failures are logged and do not stop the teardown.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<(InstanceId, InstanceSlot)> = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut count = 0;
        for (id, slot) in drained {
            let mut instance = lock_instance(&slot);
            // Already torn down by a concurrent `destroy`.
            if instance.is_destroyed() {
                continue;
            }
            count += 1;
            let backend_id = instance.backend_id();
            instance.invalidate();
            if let Err(err) = self.backend.destroy(backend_id) {
                warn!(instance = %id, error = %err, "backend failed to destroy instance");
            }
        }
        if count > 0 {
            info!(count, "simulator registry shut down");
        }
        count
    }

    fn with_instance<T>(
        &self,
        id: InstanceId,
        f: impl FnOnce(&mut SimulatorInstance) -> QsimResult<T>,
    ) -> QsimResult<T> {
        let slot = self.slot(id)?;
        let mut instance = lock_instance(&slot);
        // Destroyed between lookup and lock.
        if instance.is_destroyed() {
            return Err(QsimError::InvalidInstance(id));
        }
        f(&mut *instance)
    }

    fn slot(&self, id: InstanceId) -> QsimResult<InstanceSlot> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(QsimError::InvalidInstance(id))
    }
}

impl Drop for SimulatorRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_instance(slot: &InstanceSlot) -> MutexGuard<'_, SimulatorInstance> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
