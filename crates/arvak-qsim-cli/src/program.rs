//! Program files for the `run` command.
//!
//! A program names how many qubits to allocate up front and lists the steps
//! to execute. Qubits are referenced by allocation index: the initial
//! allocation gets indices `0..qubits`, each `allocate` step appends more.
//!
//! ```yaml
//! name: bell
//! qubits: 2
//! steps:
//!   - gate: h
//!     targets: [0]
//!   - gate: x
//!     controls: [0]
//!     targets: [1]
//!   - gate: exp
//!     paulis: [z, z]
//!     angle: 0.25
//!     targets: [0, 1]
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use arvak_qsim::{FixedGate, Gate, Pauli};

/// A parsed program file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Qubits allocated before the first step.
    #[serde(default)]
    pub qubits: usize,

    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_name() -> String {
    "program".to_string()
}

/// One program step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Allocate this many more qubits.
    Allocate { allocate: usize },
    /// Release the qubit at this allocation index.
    Release { release: usize },
    /// Apply a gate.
    Gate(GateStep),
}

/// A gate application as written in a program file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateStep {
    /// Gate name (`h`, `rx`, `exp`, ...).
    pub gate: String,

    /// Rotation angle for parametrized gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,

    /// Pauli axis for `r`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pauli: Option<String>,

    /// Pauli string for `exp`, one entry per target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paulis: Vec<String>,

    /// Control qubit indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<usize>,

    /// Target qubit indices.
    pub targets: Vec<usize>,
}

impl GateStep {
    /// Build the gate this step names.
    ///
    /// Angles are passed through unchecked; the control layer rejects
    /// non-finite ones at dispatch.
    pub fn to_gate(&self) -> Result<Gate> {
        let name = self.gate.to_ascii_lowercase();
        if let Ok(fixed) = name.parse::<FixedGate>() {
            if self.angle.is_some() {
                bail!("gate '{name}' takes no angle");
            }
            return Ok(fixed.into());
        }

        let angle = self
            .angle
            .ok_or_else(|| anyhow!("gate '{name}' requires an angle"))?;
        match name.as_str() {
            "rx" => Ok(Gate::rx(angle)),
            "ry" => Ok(Gate::ry(angle)),
            "rz" => Ok(Gate::rz(angle)),
            "r1" | "p" | "phase" => Ok(Gate::r1(angle)),
            "r" => {
                let pauli = self
                    .pauli
                    .as_deref()
                    .ok_or_else(|| anyhow!("gate 'r' requires a pauli axis"))?;
                Ok(Gate::r(parse_pauli(pauli)?, angle))
            }
            "exp" => {
                let paulis = self
                    .paulis
                    .iter()
                    .map(|p| parse_pauli(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Gate::exp(paulis, angle))
            }
            other => bail!("unknown gate '{other}'"),
        }
    }
}

fn parse_pauli(s: &str) -> Result<Pauli> {
    s.parse::<Pauli>().map_err(|e| anyhow!(e))
}

impl Program {
    /// Parse a program from YAML or JSON text.
    pub fn parse(source: &str, format: ProgramFormat) -> Result<Self> {
        match format {
            ProgramFormat::Yaml => serde_yaml_ng::from_str(source).context("invalid YAML program"),
            ProgramFormat::Json => serde_json::from_str(source).context("invalid JSON program"),
        }
    }

    /// Load a program file, choosing the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("File not found: {}", path.display());
        }
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ProgramFormat::Json,
            _ => ProgramFormat::Yaml,
        };
        Self::parse(&source, format)
    }

    /// Number of gate steps.
    pub fn gate_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Gate(_)))
            .count()
    }
}

/// Encodings accepted for program files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramFormat {
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(gate: &str) -> GateStep {
        GateStep {
            gate: gate.to_string(),
            angle: None,
            pauli: None,
            paulis: Vec::new(),
            controls: Vec::new(),
            targets: vec![0],
        }
    }

    #[test]
    fn test_parse_yaml() {
        let program = Program::parse(
            "name: bell\nqubits: 2\nsteps:\n  - gate: h\n    targets: [0]\n  - gate: x\n    controls: [0]\n    targets: [1]\n  - release: 1\n  - allocate: 2\n",
            ProgramFormat::Yaml,
        )
        .unwrap();
        assert_eq!(program.name, "bell");
        assert_eq!(program.qubits, 2);
        assert_eq!(program.steps.len(), 4);
        assert_eq!(program.gate_count(), 2);
        assert!(matches!(program.steps[2], Step::Release { release: 1 }));
        assert!(matches!(program.steps[3], Step::Allocate { allocate: 2 }));
    }

    #[test]
    fn test_parse_json() {
        let program = Program::parse(
            r#"{"qubits": 1, "steps": [{"gate": "rz", "angle": 0.5, "targets": [0]}]}"#,
            ProgramFormat::Json,
        )
        .unwrap();
        assert_eq!(program.name, "program");
        match &program.steps[0] {
            Step::Gate(g) => assert_eq!(g.to_gate().unwrap(), Gate::rz(0.5)),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_fixed_gates() {
        assert_eq!(step("H").to_gate().unwrap(), Gate::H);
        assert_eq!(step("sdg").to_gate().unwrap(), Gate::SDG);
        assert_eq!(step("i").to_gate().unwrap(), Gate::I);

        let mut with_angle = step("x");
        with_angle.angle = Some(1.0);
        assert!(with_angle.to_gate().is_err());
    }

    #[test]
    fn test_parametrized_gates() {
        let mut g = step("r");
        g.angle = Some(0.3);
        g.pauli = Some("Y".to_string());
        assert_eq!(g.to_gate().unwrap(), Gate::r(Pauli::Y, 0.3));

        let mut g = step("exp");
        g.angle = Some(1.5);
        g.paulis = vec!["x".to_string(), "z".to_string()];
        assert_eq!(g.to_gate().unwrap(), Gate::exp(vec![Pauli::X, Pauli::Z], 1.5));
    }

    #[test]
    fn test_missing_angle() {
        assert!(step("ry").to_gate().is_err());
    }

    #[test]
    fn test_unknown_gate() {
        let mut g = step("cnot");
        g.angle = Some(0.0);
        assert!(g.to_gate().is_err());
    }

    #[test]
    fn test_from_file_picks_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, r#"{"qubits": 3}"#).unwrap();
        let program = Program::from_file(&path).unwrap();
        assert_eq!(program.qubits, 3);
        assert!(program.steps.is_empty());
    }
}
