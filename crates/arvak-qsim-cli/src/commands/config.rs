//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use arvak_qsim::QsimConfig;

/// Execute the config command.
///
/// Prints the configuration after file loading, environment overrides and
/// validation, as YAML that can be saved back as a config file.
pub fn execute(config: &QsimConfig, explicit: Option<&Path>) -> Result<()> {
    let source = match (explicit, QsimConfig::default_path()) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(path)) if path.exists() => path.display().to_string(),
        _ => "built-in defaults".to_string(),
    };

    println!(
        "{} Effective configuration {}\n",
        style("Arvak qsim").cyan().bold(),
        style(format!("(from {source})")).dim()
    );
    let yaml = serde_yaml_ng::to_string(config).context("Failed to serialize configuration")?;
    print!("{yaml}");
    Ok(())
}
