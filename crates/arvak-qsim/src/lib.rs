//! Arvak Simulator Control Layer
//!
//! This crate manages simulator instances, hands out qubit handles, validates
//! every gate invocation and dispatches it to a numerical backend. It holds no
//! amplitudes itself: the state of each instance lives in a [`QuantumBackend`]
//! and is referred to only by a numeric id.
//!
//! # Overview
//!
//! - [`SimulatorRegistry`] owns the live instances and routes calls
//! - [`Qubit`] handles are bound to the instance that allocated them
//! - [`validation`] holds the pure checks (uniqueness, liveness, angles)
//! - [`Gate`] is a tagged value over fixed and parametrized gates; controls
//!   are attached per [`GateOperation`], never baked into the gate
//! - [`RecordingBackend`] logs invocations for tests and dry runs
//!
//! A statevector backend lives in `arvak-adapter-qsim`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arvak_qsim::{Gate, QsimError, RecordingBackend, SimulatorRegistry};
//!
//! let backend = Arc::new(RecordingBackend::new());
//! let registry = SimulatorRegistry::new(backend.clone());
//!
//! let sim = registry.create().unwrap();
//! let q0 = registry.allocate_qubit(sim).unwrap();
//! let q1 = registry.allocate_qubit(sim).unwrap();
//!
//! // Controlled-H: control q1, target q0.
//! registry.apply_controlled(sim, &[q1], Gate::H, q0).unwrap();
//!
//! // A qubit cannot be both control and target.
//! let err = registry.apply_controlled(sim, &[q0], Gate::H, q0).unwrap_err();
//! assert!(matches!(err, QsimError::QubitUniqueness { .. }));
//!
//! assert_eq!(backend.call_count(), 1);
//! ```

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod instance;
pub mod qubit;
pub mod recording;
pub mod registry;
pub mod validation;

pub use backend::{BackendError, BackendResult, GateCall, QuantumBackend, StateDump};
pub use config::{
    BackendKind, BackendSettings, ConfigError, LimitsConfig, LoggingConfig, QsimConfig,
};
pub use dispatch::validate_operation;
pub use error::{InvalidQubitReason, QsimError, QsimResult};
pub use gate::{FixedGate, Gate, GateOperation, ParametrizedGate, Pauli};
pub use instance::SimulatorInstance;
pub use qubit::{BackendId, InstanceId, Qubit, QubitId};
pub use recording::{LifecycleEvent, RecordedCall, RecordingBackend};
pub use registry::SimulatorRegistry;
