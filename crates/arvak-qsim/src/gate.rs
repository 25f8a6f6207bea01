//! Gate model.
//!
//! A gate is a tagged value: either a parameter-free [`FixedGate`] or a
//! [`ParametrizedGate`] carrying its angle. Control qubits are not part of the
//! gate; they are attached to a [`GateOperation`], so every gate can be applied
//! with any number of controls without a separate controlled variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::qubit::Qubit;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        };
        write!(f, "{c}")
    }
}

impl FromStr for Pauli {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i" => Ok(Pauli::I),
            "x" => Ok(Pauli::X),
            "y" => Ok(Pauli::Y),
            "z" => Ok(Pauli::Z),
            other => Err(format!("unknown Pauli operator '{other}'")),
        }
    }
}

/// Gates without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// SWAP gate (two targets).
    Swap,
}

impl FixedGate {
    /// All fixed gates, in declaration order.
    pub const ALL: [FixedGate; 10] = [
        FixedGate::I,
        FixedGate::X,
        FixedGate::Y,
        FixedGate::Z,
        FixedGate::H,
        FixedGate::S,
        FixedGate::Sdg,
        FixedGate::T,
        FixedGate::Tdg,
        FixedGate::Swap,
    ];

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            FixedGate::I => "id",
            FixedGate::X => "x",
            FixedGate::Y => "y",
            FixedGate::Z => "z",
            FixedGate::H => "h",
            FixedGate::S => "s",
            FixedGate::Sdg => "sdg",
            FixedGate::T => "t",
            FixedGate::Tdg => "tdg",
            FixedGate::Swap => "swap",
        }
    }

    /// Number of target qubits.
    #[inline]
    pub fn num_targets(&self) -> usize {
        match self {
            FixedGate::Swap => 2,
            _ => 1,
        }
    }

    /// The inverse gate.
    pub fn adjoint(&self) -> FixedGate {
        match self {
            FixedGate::S => FixedGate::Sdg,
            FixedGate::Sdg => FixedGate::S,
            FixedGate::T => FixedGate::Tdg,
            FixedGate::Tdg => FixedGate::T,
            other => *other,
        }
    }
}

impl FromStr for FixedGate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "i" {
            return Ok(FixedGate::I);
        }
        FixedGate::ALL
            .iter()
            .find(|g| g.name() == lower)
            .copied()
            .ok_or_else(|| format!("unknown fixed gate '{s}'"))
    }
}

/// Gates taking a continuous angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParametrizedGate {
    /// Rotation around X: exp(-iθX/2).
    Rx(f64),
    /// Rotation around Y: exp(-iθY/2).
    Ry(f64),
    /// Rotation around Z: exp(-iθZ/2).
    Rz(f64),
    /// Phase on |1⟩: diag(1, e^{iθ}).
    R1(f64),
    /// Rotation around an arbitrary Pauli axis: exp(-iθP/2).
    R(Pauli, f64),
    /// Multi-qubit Pauli exponential: exp(iθ P₁⊗…⊗Pₙ), one target per Pauli.
    Exp(Vec<Pauli>, f64),
}

impl ParametrizedGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            ParametrizedGate::Rx(_) => "rx",
            ParametrizedGate::Ry(_) => "ry",
            ParametrizedGate::Rz(_) => "rz",
            ParametrizedGate::R1(_) => "r1",
            ParametrizedGate::R(_, _) => "r",
            ParametrizedGate::Exp(_, _) => "exp",
        }
    }

    /// The gate's angle.
    #[inline]
    pub fn angle(&self) -> f64 {
        match self {
            ParametrizedGate::Rx(theta)
            | ParametrizedGate::Ry(theta)
            | ParametrizedGate::Rz(theta)
            | ParametrizedGate::R1(theta)
            | ParametrizedGate::R(_, theta)
            | ParametrizedGate::Exp(_, theta) => *theta,
        }
    }

    /// Number of target qubits.
    pub fn num_targets(&self) -> usize {
        match self {
            ParametrizedGate::Exp(paulis, _) => paulis.len(),
            _ => 1,
        }
    }

    /// The inverse gate (same axis, negated angle).
    pub fn adjoint(&self) -> ParametrizedGate {
        match self {
            ParametrizedGate::Rx(theta) => ParametrizedGate::Rx(-theta),
            ParametrizedGate::Ry(theta) => ParametrizedGate::Ry(-theta),
            ParametrizedGate::Rz(theta) => ParametrizedGate::Rz(-theta),
            ParametrizedGate::R1(theta) => ParametrizedGate::R1(-theta),
            ParametrizedGate::R(pauli, theta) => ParametrizedGate::R(*pauli, -theta),
            ParametrizedGate::Exp(paulis, theta) => ParametrizedGate::Exp(paulis.clone(), -theta),
        }
    }
}

/// A gate: fixed or parametrized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// A parameter-free gate.
    Fixed(FixedGate),
    /// A gate with a continuous parameter.
    Parametrized(ParametrizedGate),
}

impl Gate {
    /// Identity.
    pub const I: Gate = Gate::Fixed(FixedGate::I);
    /// Pauli-X.
    pub const X: Gate = Gate::Fixed(FixedGate::X);
    /// Pauli-Y.
    pub const Y: Gate = Gate::Fixed(FixedGate::Y);
    /// Pauli-Z.
    pub const Z: Gate = Gate::Fixed(FixedGate::Z);
    /// Hadamard.
    pub const H: Gate = Gate::Fixed(FixedGate::H);
    /// S.
    pub const S: Gate = Gate::Fixed(FixedGate::S);
    /// S-dagger.
    pub const SDG: Gate = Gate::Fixed(FixedGate::Sdg);
    /// T.
    pub const T: Gate = Gate::Fixed(FixedGate::T);
    /// T-dagger.
    pub const TDG: Gate = Gate::Fixed(FixedGate::Tdg);
    /// SWAP.
    pub const SWAP: Gate = Gate::Fixed(FixedGate::Swap);

    /// Rotation around X.
    pub fn rx(theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::Rx(theta))
    }

    /// Rotation around Y.
    pub fn ry(theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::Ry(theta))
    }

    /// Rotation around Z.
    pub fn rz(theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::Rz(theta))
    }

    /// Phase on |1⟩.
    pub fn r1(theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::R1(theta))
    }

    /// Rotation around a Pauli axis.
    pub fn r(pauli: Pauli, theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::R(pauli, theta))
    }

    /// Multi-qubit Pauli exponential.
    pub fn exp(paulis: impl Into<Vec<Pauli>>, theta: f64) -> Self {
        Gate::Parametrized(ParametrizedGate::Exp(paulis.into(), theta))
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Gate::Fixed(g) => g.name(),
            Gate::Parametrized(g) => g.name(),
        }
    }

    /// Number of target qubits, excluding controls.
    #[inline]
    pub fn num_targets(&self) -> usize {
        match self {
            Gate::Fixed(g) => g.num_targets(),
            Gate::Parametrized(g) => g.num_targets(),
        }
    }

    /// Check if this gate carries a parameter.
    pub fn is_parametrized(&self) -> bool {
        matches!(self, Gate::Parametrized(_))
    }

    /// The gate's angle, if any.
    pub fn angle(&self) -> Option<f64> {
        match self {
            Gate::Fixed(_) => None,
            Gate::Parametrized(g) => Some(g.angle()),
        }
    }

    /// The inverse gate.
    pub fn adjoint(&self) -> Gate {
        match self {
            Gate::Fixed(g) => Gate::Fixed(g.adjoint()),
            Gate::Parametrized(g) => Gate::Parametrized(g.adjoint()),
        }
    }
}

impl From<FixedGate> for Gate {
    fn from(gate: FixedGate) -> Self {
        Gate::Fixed(gate)
    }
}

impl From<ParametrizedGate> for Gate {
    fn from(gate: ParametrizedGate) -> Self {
        Gate::Parametrized(gate)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Fixed(g) => write!(f, "{}", g.name()),
            Gate::Parametrized(ParametrizedGate::R(pauli, theta)) => {
                write!(f, "r({pauli}, {theta})")
            }
            Gate::Parametrized(ParametrizedGate::Exp(paulis, theta)) => {
                let axes: String = paulis.iter().map(ToString::to_string).collect();
                write!(f, "exp({axes}, {theta})")
            }
            Gate::Parametrized(g) => write!(f, "{}({})", g.name(), g.angle()),
        }
    }
}

/// A gate applied to target qubits, optionally under control qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOperation {
    gate: Gate,
    targets: Vec<Qubit>,
    controls: Vec<Qubit>,
}

impl GateOperation {
    /// Create an uncontrolled operation.
    pub fn new(gate: impl Into<Gate>, targets: impl Into<Vec<Qubit>>) -> Self {
        Self {
            gate: gate.into(),
            targets: targets.into(),
            controls: Vec::new(),
        }
    }

    /// Create an uncontrolled operation on a single target.
    pub fn single(gate: impl Into<Gate>, target: Qubit) -> Self {
        Self::new(gate, vec![target])
    }

    /// Attach control qubits. An empty list leaves the operation uncontrolled.
    #[must_use]
    pub fn controlled_by(mut self, controls: impl Into<Vec<Qubit>>) -> Self {
        self.controls = controls.into();
        self
    }

    /// The gate.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// The target qubits.
    pub fn targets(&self) -> &[Qubit] {
        &self.targets
    }

    /// The control qubits (empty when uncontrolled).
    pub fn controls(&self) -> &[Qubit] {
        &self.controls
    }

    /// Check if any controls are attached.
    pub fn is_controlled(&self) -> bool {
        !self.controls.is_empty()
    }

    /// Controls followed by targets.
    pub fn qubits(&self) -> impl Iterator<Item = &Qubit> {
        self.controls.iter().chain(self.targets.iter())
    }
}
