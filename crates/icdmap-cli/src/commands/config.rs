//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use icdmap_core::models::config::IcdmapConfig;

use super::{default_config_path, load_or_default};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "extraction.pattern")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (JSON, or a plain string)
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

/// Manage the file at `config_path`, or at the default location.
pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    match args.command {
        ConfigCommand::Show => show_config(&config_path),
        ConfigCommand::Init(init_args) => init_config(init_args, &config_path),
        ConfigCommand::Get { key } => {
            let config = load_or_default(&config_path)?;
            println!("{}", serde_json::to_string_pretty(&get_value(&config, &key)?)?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => set_config(&config_path, &key, &value),
        ConfigCommand::Path => show_path(&config_path),
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("{} No config file found, showing defaults.", style("ℹ").blue());
    }
    let config = load_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: InitArgs, default_path: &Path) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| default_path.to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    IcdmapConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

/// Look up a dotted key in the configuration.
fn get_value(config: &IcdmapConfig, key: &str) -> anyhow::Result<Value> {
    let json = serde_json::to_value(config)?;
    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }
    Ok(current.clone())
}

/// Return a copy of `config` with a dotted key replaced.
///
/// `value` is parsed as JSON first, so `true` and `500` keep their types;
/// anything else is stored as a string. The result must still deserialize
/// and its code pattern must still compile.
fn with_value(config: &IcdmapConfig, key: &str, value: &str) -> anyhow::Result<IcdmapConfig> {
    let parsed: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut json = serde_json::to_value(config)?;
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("Empty configuration key");
    };

    let mut current = &mut json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }
    let Some(obj) = current.as_object_mut() else {
        anyhow::bail!("Cannot set value at non-object path");
    };
    if !obj.contains_key(*last) {
        anyhow::bail!("Configuration key not found: {}", key);
    }
    obj.insert((*last).to_string(), parsed);

    let updated: IcdmapConfig = serde_json::from_value(json)?;
    updated.code_pattern()?;
    Ok(updated)
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = load_or_default(path)?;
    let updated = with_value(&config, key, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    updated.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&get_value(&updated, key)?)?
    );

    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'icdmap config init' to create a configuration file.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_value() {
        let config = IcdmapConfig::default();
        assert_eq!(get_value(&config, "output.pretty").unwrap(), Value::Bool(true));
        assert!(get_value(&config, "output.missing").is_err());
    }

    #[test]
    fn test_with_value_keeps_types() {
        let config = IcdmapConfig::default();
        let updated = with_value(&config, "pdf.default_glyph_width", "600").unwrap();
        assert_eq!(updated.pdf.default_glyph_width, 600.0);

        let updated = with_value(&updated, "output.output_dir", "results").unwrap();
        assert_eq!(updated.output.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_with_value_rejects_bad_input() {
        let config = IcdmapConfig::default();
        assert!(with_value(&config, "extraction.pattern", "([A-Z]").is_err());
        assert!(with_value(&config, "output.pretty", "\"yes\"").is_err());
        assert!(with_value(&config, "nope.key", "1").is_err());
        assert!(with_value(&config, "output.colour", "1").is_err());
    }
}
