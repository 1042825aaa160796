//! Subcommands and the option handling they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod words;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use icdmap_core::codes::{BARE_ICD10_PATTERN, CodePattern};
use icdmap_core::models::config::IcdmapConfig;

/// Code pattern overrides shared by the extraction commands.
#[derive(Args, Debug, Default)]
pub struct PatternArgs {
    /// Custom code pattern (regex; group 1 is a comma separated code block)
    #[arg(long)]
    pattern: Option<String>,

    /// Match bare ICD-10 codes instead of labeled code blocks
    #[arg(long, conflicts_with = "pattern")]
    bare: bool,
}

impl PatternArgs {
    /// Apply the overrides to a loaded configuration.
    pub fn apply(&self, config: &mut IcdmapConfig) {
        if let Some(pattern) = &self.pattern {
            config.extraction.pattern = pattern.clone();
        } else if self.bare {
            config.extraction.pattern = BARE_ICD10_PATTERN.to_string();
        }
    }
}

/// Where `icdmap config` keeps the user's configuration.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("icdmap")
        .join("config.json")
}

/// Read `path`, or fall back to defaults when it does not exist.
pub fn load_or_default(path: &Path) -> anyhow::Result<IcdmapConfig> {
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(IcdmapConfig::from_file(path)?)
    } else {
        Ok(IcdmapConfig::default())
    }
}

/// Load the given configuration file, else the default one if present.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<IcdmapConfig> {
    let config = match config_path {
        Some(path) => IcdmapConfig::from_file(Path::new(path))?,
        None => load_or_default(&default_config_path())?,
    };
    debug!("Using code pattern {}", config.extraction.pattern);
    Ok(config)
}

/// Load configuration and fail early if the code pattern does not compile.
pub fn load_validated_config(
    config_path: Option<&str>,
    overrides: &PatternArgs,
) -> anyhow::Result<IcdmapConfig> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);
    CodePattern::new(&config.extraction.pattern)?;
    Ok(config)
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
