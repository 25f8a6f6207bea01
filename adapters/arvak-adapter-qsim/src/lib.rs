//! Arvak Statevector Backend
//!
//! A [`QuantumBackend`](arvak_qsim::QuantumBackend) that keeps one dense
//! statevector per simulator instance. The register grows by one qubit per
//! allocation and shrinks on release, reusing the lowest free qubit id.
//!
//! # Gate kernels
//!
//! - A masked 2x2 kernel covers every single-qubit fixed gate and the
//!   Rx/Ry/Rz/R1 rotations, with or without controls
//! - A Pauli-string kernel covers `R` and `Exp`
//! - Swap uses a masked index permutation
//!
//! # Memory
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arvak_adapter_qsim::StatevectorBackend;
//! use arvak_qsim::{Gate, SimulatorRegistry};
//!
//! let registry = SimulatorRegistry::new(Arc::new(StatevectorBackend::new()));
//! let sim = registry.create().unwrap();
//! let q = registry.allocate_qubits(sim, 2).unwrap();
//!
//! registry.apply_gate(sim, Gate::H, q[0]).unwrap();
//! registry.apply_controlled(sim, &[q[0]], Gate::X, q[1]).unwrap();
//!
//! let probs = registry.dump(sim).unwrap().probabilities();
//! assert!((probs[0b00] - 0.5).abs() < 1e-12);
//! assert!((probs[0b11] - 0.5).abs() < 1e-12);
//! ```

mod simulator;
mod statevector;

pub use simulator::StatevectorBackend;
pub use statevector::Statevector;
