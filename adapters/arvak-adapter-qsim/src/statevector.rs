//! Statevector simulation engine with a growable qubit register.

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use arvak_qsim::{
    BackendError, BackendResult, FixedGate, Gate, ParametrizedGate, Pauli, QubitId, StateDump,
};

/// Amplitude mass below which a qubit counts as sitting in a basis state.
const CLASSICAL_TOLERANCE: f64 = 1e-10;

type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A statevector over a dynamically sized register.
///
/// Bit `i` of an amplitude index is the value of `qubits[i]`. A fresh
/// statevector holds zero qubits and the single amplitude `1`.
#[derive(Debug, Clone)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Qubit id held by each bit position.
    qubits: Vec<QubitId>,
}

impl Default for Statevector {
    fn default() -> Self {
        Self::new()
    }
}

impl Statevector {
    /// Create an empty register.
    pub fn new() -> Self {
        Self {
            amplitudes: vec![ONE],
            qubits: Vec::new(),
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Qubit ids in bit order.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// The raw amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Add a qubit in |0⟩ under the lowest id not currently in use.
    pub fn allocate(&mut self) -> QubitId {
        let id = (0..)
            .map(QubitId)
            .find(|id| !self.qubits.contains(id))
            .unwrap_or(QubitId(u32::MAX));
        self.qubits.push(id);
        let len = self.amplitudes.len();
        self.amplitudes.resize(len * 2, ZERO);
        id
    }

    /// Probability of measuring `qubit` as 1.
    pub fn probability_one(&self, qubit: QubitId) -> BackendResult<f64> {
        let mask: usize = 1 << self.bit_of(qubit)?;
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|&(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum())
    }

    /// Remove `qubit` from the register.
    ///
    /// The qubit must be in a basis state; it is projected onto that state
    /// and the remaining amplitudes are renormalized.
    pub fn release(&mut self, qubit: QubitId) -> BackendResult<()> {
        let bit = self.bit_of(qubit)?;
        let p1 = self.probability_one(qubit)?;
        let (value, norm) = if p1 <= CLASSICAL_TOLERANCE {
            (0usize, 1.0 - p1)
        } else if p1 >= 1.0 - CLASSICAL_TOLERANCE {
            (1, p1)
        } else {
            return Err(BackendError::Failed(format!(
                "cannot release qubit {qubit}: not in a basis state (P(1) = {p1:.6})"
            )));
        };

        let scale = 1.0 / norm.sqrt();
        let low_mask: usize = (1 << bit) - 1;
        let half = self.amplitudes.len() / 2;
        self.amplitudes = (0..half)
            .map(|k| {
                let old = ((k >> bit) << (bit + 1)) | (value << bit) | (k & low_mask);
                self.amplitudes[old] * scale
            })
            .collect();
        self.qubits.remove(bit);
        Ok(())
    }

    /// Apply `gate` to `targets` under `controls`.
    pub fn apply(
        &mut self,
        gate: &Gate,
        controls: &[QubitId],
        targets: &[QubitId],
    ) -> BackendResult<()> {
        if targets.len() != gate.num_targets() {
            return Err(BackendError::Failed(format!(
                "gate {gate} takes {} target(s), got {}",
                gate.num_targets(),
                targets.len()
            )));
        }

        let mut control_mask = 0usize;
        for &c in controls {
            control_mask |= 1 << self.bit_of(c)?;
        }
        let bits = targets
            .iter()
            .map(|&t| self.bit_of(t))
            .collect::<BackendResult<Vec<_>>>()?;

        match gate {
            Gate::Fixed(FixedGate::I) => {}
            Gate::Fixed(FixedGate::Swap) => self.apply_swap(bits[0], bits[1], control_mask),
            Gate::Fixed(fixed) => self.apply_matrix(bits[0], fixed_matrix(*fixed), control_mask),
            Gate::Parametrized(ParametrizedGate::R(pauli, theta)) => {
                self.apply_pauli_exp(&[(*pauli, bits[0])], -theta / 2.0, control_mask);
            }
            Gate::Parametrized(ParametrizedGate::Exp(paulis, theta)) => {
                let terms: Vec<_> = paulis.iter().copied().zip(bits.iter().copied()).collect();
                self.apply_pauli_exp(&terms, *theta, control_mask);
            }
            Gate::Parametrized(rotation) => {
                self.apply_matrix(bits[0], rotation_matrix(rotation), control_mask);
            }
        }
        Ok(())
    }

    /// Snapshot of the register.
    pub fn dump(&self) -> StateDump {
        StateDump {
            qubits: self.qubits.clone(),
            amplitudes: self.amplitudes.clone(),
        }
    }

    fn bit_of(&self, qubit: QubitId) -> BackendResult<usize> {
        self.qubits
            .iter()
            .position(|&q| q == qubit)
            .ok_or_else(|| BackendError::Failed(format!("qubit {qubit} is not allocated")))
    }

    // =========================================================================
    // Kernels
    // =========================================================================

    /// Apply a 2x2 unitary to `bit` on the subspace where every control bit is set.
    fn apply_matrix(&mut self, bit: usize, m: Matrix2, control_mask: usize) {
        let mask: usize = 1 << bit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 && i & control_mask == control_mask {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    /// Apply exp(iθ P) where P is the tensor product of `terms`.
    fn apply_pauli_exp(&mut self, terms: &[(Pauli, usize)], theta: f64, control_mask: usize) {
        let mut flip = 0usize;
        let mut y_mask = 0usize;
        let mut z_mask = 0usize;
        for &(pauli, bit) in terms {
            match pauli {
                Pauli::I => {}
                Pauli::X => flip |= 1 << bit,
                Pauli::Y => {
                    flip |= 1 << bit;
                    y_mask |= 1 << bit;
                }
                Pauli::Z => z_mask |= 1 << bit,
            }
        }

        // P² = 1, so exp(iθP) = cos θ + i sin θ P.
        let cos = Complex64::new(theta.cos(), 0.0);
        let i_sin = Complex64::new(0.0, theta.sin());
        let old = self.amplitudes.clone();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & control_mask == control_mask {
                let src = i ^ flip;
                *amp = cos * old[i] + i_sin * pauli_phase(src, y_mask, z_mask) * old[src];
            }
        }
    }

    fn apply_swap(&mut self, a: usize, b: usize, control_mask: usize) {
        let mask_a: usize = 1 << a;
        let mask_b: usize = 1 << b;
        for i in 0..self.amplitudes.len() {
            if i & control_mask == control_mask && i & mask_a != 0 && i & mask_b == 0 {
                let j = (i & !mask_a) | mask_b;
                self.amplitudes.swap(i, j);
            }
        }
    }
}

/// Phase picked up by basis state `index` under a Pauli string:
/// Y|0⟩ = i|1⟩, Y|1⟩ = -i|0⟩, Z|1⟩ = -|1⟩.
fn pauli_phase(index: usize, y_mask: usize, z_mask: usize) -> Complex64 {
    let i_power = y_mask.count_ones() % 4;
    let negations = (index & y_mask).count_ones() + (index & z_mask).count_ones();
    let phase = match i_power {
        0 => ONE,
        1 => I,
        2 => -ONE,
        _ => -I,
    };
    if negations % 2 == 1 { -phase } else { phase }
}

fn diag(phase: Complex64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, phase]]
}

fn fixed_matrix(gate: FixedGate) -> Matrix2 {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    match gate {
        FixedGate::I | FixedGate::Swap => [[ONE, ZERO], [ZERO, ONE]],
        FixedGate::X => [[ZERO, ONE], [ONE, ZERO]],
        FixedGate::Y => [[ZERO, -I], [I, ZERO]],
        FixedGate::Z => diag(-ONE),
        FixedGate::H => [[h, h], [h, -h]],
        FixedGate::S => diag(I),
        FixedGate::Sdg => diag(-I),
        FixedGate::T => diag(Complex64::from_polar(1.0, std::f64::consts::FRAC_PI_4)),
        FixedGate::Tdg => diag(Complex64::from_polar(1.0, -std::f64::consts::FRAC_PI_4)),
    }
}

fn rotation_matrix(gate: &ParametrizedGate) -> Matrix2 {
    let theta = gate.angle();
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = (theta / 2.0).sin();
    match gate {
        ParametrizedGate::Rx(_) => {
            let neg_i_s = Complex64::new(0.0, -s);
            [[c, neg_i_s], [neg_i_s, c]]
        }
        ParametrizedGate::Ry(_) => {
            let s = Complex64::new(s, 0.0);
            [[c, -s], [s, c]]
        }
        ParametrizedGate::Rz(_) => [
            [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
            [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
        ],
        ParametrizedGate::R1(_) => diag(Complex64::from_polar(1.0, theta)),
        // Pauli exponentials use their own kernel.
        ParametrizedGate::R(..) | ParametrizedGate::Exp(..) => [[ONE, ZERO], [ZERO, ONE]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn assert_state(sv: &Statevector, expected: &[Complex64]) {
        assert_eq!(sv.amplitudes().len(), expected.len());
        for (i, (a, b)) in sv.amplitudes().iter().zip(expected).enumerate() {
            assert!(approx_eq(*a, *b), "amplitude {i}: {a} != {b}");
        }
    }

    fn register(n: usize) -> (Statevector, Vec<QubitId>) {
        let mut sv = Statevector::new();
        let qubits = (0..n).map(|_| sv.allocate()).collect();
        (sv, qubits)
    }

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new();
        assert_eq!(sv.num_qubits(), 0);
        assert_state(&sv, &[ONE]);

        let (sv, qubits) = register(2);
        assert_eq!(qubits, vec![QubitId(0), QubitId(1)]);
        assert_state(&sv, &[ONE, ZERO, ZERO, ZERO]);
    }

    #[test]
    fn test_hadamard() {
        let (mut sv, q) = register(1);
        sv.apply(&Gate::H, &[], &q).unwrap();
        assert_state(&sv, &[c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2)]);
    }

    #[test]
    fn test_bell_state() {
        let (mut sv, q) = register(2);
        sv.apply(&Gate::H, &[], &[q[0]]).unwrap();
        sv.apply(&Gate::X, &[q[0]], &[q[1]]).unwrap();
        assert_state(&sv, &[c(FRAC_1_SQRT_2), ZERO, ZERO, c(FRAC_1_SQRT_2)]);
    }

    #[test]
    fn test_controlled_h_needs_control_set() {
        let (mut sv, q) = register(2);
        sv.apply(&Gate::H, &[q[1]], &[q[0]]).unwrap();
        assert_state(&sv, &[ONE, ZERO, ZERO, ZERO]);

        sv.apply(&Gate::X, &[], &[q[1]]).unwrap();
        sv.apply(&Gate::H, &[q[1]], &[q[0]]).unwrap();
        assert_state(&sv, &[ZERO, ZERO, c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2)]);
    }

    #[test]
    fn test_toffoli() {
        let (mut sv, q) = register(3);
        sv.apply(&Gate::X, &[], &[q[0]]).unwrap();
        sv.apply(&Gate::X, &[q[0], q[1]], &[q[2]]).unwrap();
        assert_state(&sv, &[ZERO, ONE, ZERO, ZERO, ZERO, ZERO, ZERO, ZERO]);

        sv.apply(&Gate::X, &[], &[q[1]]).unwrap();
        sv.apply(&Gate::X, &[q[0], q[1]], &[q[2]]).unwrap();
        assert!(approx_eq(sv.amplitudes()[0b111], ONE));
    }

    #[test]
    fn test_controlled_r_identity_is_relative_phase() {
        let theta = 1.2;
        let (mut sv, q) = register(2);
        sv.apply(&Gate::H, &[], &[q[1]]).unwrap();
        sv.apply(&Gate::r(Pauli::I, theta), &[q[1]], &[q[0]]).unwrap();

        let phase = Complex64::from_polar(FRAC_1_SQRT_2, -theta / 2.0);
        assert_state(&sv, &[c(FRAC_1_SQRT_2), ZERO, phase, ZERO]);
    }

    #[test]
    fn test_r_matches_rotations() {
        let theta = 0.7;
        for (pauli, rotation) in [
            (Pauli::X, Gate::rx(theta)),
            (Pauli::Y, Gate::ry(theta)),
            (Pauli::Z, Gate::rz(theta)),
        ] {
            let (mut a, q) = register(1);
            a.apply(&Gate::H, &[], &q).unwrap();
            a.apply(&Gate::S, &[], &q).unwrap();
            let mut b = a.clone();

            a.apply(&Gate::r(pauli, theta), &[], &q).unwrap();
            b.apply(&rotation, &[], &q).unwrap();
            assert_state(&a, b.amplitudes());
        }
    }

    #[test]
    fn test_exp_zz() {
        let theta = 0.4;
        let (mut sv, q) = register(2);
        sv.apply(&Gate::H, &[], &[q[0]]).unwrap();
        sv.apply(&Gate::exp(vec![Pauli::Z, Pauli::Z], theta), &[], &q).unwrap();

        // |00⟩ has ZZ = +1, |01⟩ has ZZ = -1.
        let plus = Complex64::from_polar(FRAC_1_SQRT_2, theta);
        let minus = Complex64::from_polar(FRAC_1_SQRT_2, -theta);
        assert_state(&sv, &[plus, minus, ZERO, ZERO]);
    }

    #[test]
    fn test_exp_xx_entangles() {
        let theta = std::f64::consts::FRAC_PI_4;
        let (mut sv, q) = register(2);
        sv.apply(&Gate::exp(vec![Pauli::X, Pauli::X], theta), &[], &q).unwrap();
        assert_state(
            &sv,
            &[c(FRAC_1_SQRT_2), ZERO, ZERO, Complex64::new(0.0, FRAC_1_SQRT_2)],
        );
    }

    #[test]
    fn test_exp_y_matches_ry() {
        // exp(iθY) = Ry(-2θ)
        let theta = 0.3;
        let (mut a, q) = register(1);
        let mut b = a.clone();
        a.apply(&Gate::exp(vec![Pauli::Y], theta), &[], &q).unwrap();
        b.apply(&Gate::ry(-2.0 * theta), &[], &q).unwrap();
        assert_state(&a, b.amplitudes());
    }

    #[test]
    fn test_swap() {
        let (mut sv, q) = register(2);
        sv.apply(&Gate::X, &[], &[q[0]]).unwrap();
        sv.apply(&Gate::SWAP, &[], &q).unwrap();
        assert_state(&sv, &[ZERO, ZERO, ONE, ZERO]);
    }

    #[test]
    fn test_release_reuses_lowest_id() {
        let (mut sv, q) = register(3);
        sv.apply(&Gate::X, &[], &[q[2]]).unwrap();
        sv.release(q[1]).unwrap();
        assert_eq!(sv.qubits(), &[QubitId(0), QubitId(2)]);
        assert_state(&sv, &[ZERO, ZERO, ONE, ZERO]);

        assert_eq!(sv.allocate(), QubitId(1));
        assert_eq!(sv.qubits(), &[QubitId(0), QubitId(2), QubitId(1)]);
    }

    #[test]
    fn test_release_one_state() {
        let (mut sv, q) = register(2);
        sv.apply(&Gate::X, &[], &[q[0]]).unwrap();
        sv.apply(&Gate::H, &[], &[q[1]]).unwrap();
        sv.release(q[0]).unwrap();
        assert_state(&sv, &[c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2)]);
    }

    #[test]
    fn test_release_superposed_qubit_fails() {
        let (mut sv, q) = register(2);
        sv.apply(&Gate::H, &[], &[q[0]]).unwrap();
        assert!(matches!(sv.release(q[0]), Err(BackendError::Failed(_))));
        assert_eq!(sv.num_qubits(), 2);
    }

    #[test]
    fn test_unknown_qubit() {
        let (mut sv, _) = register(1);
        assert!(sv.apply(&Gate::X, &[], &[QubitId(7)]).is_err());
    }
}
