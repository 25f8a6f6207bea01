//! Gates command implementation.

use console::style;

use arvak_qsim::FixedGate;

/// Parametrized gates as written in program files.
const PARAMETRIZED: [(&str, &str, &str); 6] = [
    ("rx", "1", "angle"),
    ("ry", "1", "angle"),
    ("rz", "1", "angle"),
    ("r1", "1", "angle"),
    ("r", "1", "pauli, angle"),
    ("exp", "n", "paulis (one per target), angle"),
];

/// Execute the gates command.
pub fn execute() {
    println!("{} Supported gates:\n", style("Arvak qsim").cyan().bold());

    println!("  {}", style("Fixed").bold());
    for gate in FixedGate::ALL {
        println!(
            "    {:<6} targets: {}",
            style(gate.name()).green(),
            gate.num_targets()
        );
    }

    println!();
    println!("  {}", style("Parametrized").bold());
    for (name, targets, params) in PARAMETRIZED {
        println!(
            "    {:<6} targets: {}  params: {}",
            style(name).green(),
            targets,
            style(params).dim()
        );
    }

    println!();
    println!(
        "  Every gate accepts any number of {} qubits.",
        style("controls").yellow()
    );
}
