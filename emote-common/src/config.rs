//! Configuration loading and path resolution
//!
//! Settings come from `emote.toml`. Every field has a built-in default, so a
//! missing file is not an error; a file that exists but fails to parse or
//! validate is.
//!
//! Resolution priority for the config file and the leaderboard path:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::emotion::Emotion;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "EMOTE_CONFIG";

/// Environment variable naming the leaderboard file
pub const LEADERBOARD_ENV_VAR: &str = "EMOTE_LEADERBOARD";

/// Default leaderboard file, relative to the working directory
pub const DEFAULT_LEADERBOARD_FILE: &str = "leaderboard.json";

/// Which emotions a round may ask the player to act out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetSet {
    /// angry, happy, sad, surprise
    Classic,
    /// classic plus disgust and fear
    #[default]
    Extended,
}

impl TargetSet {
    pub fn emotions(&self) -> &'static [Emotion] {
        match self {
            TargetSet::Classic => &Emotion::CLASSIC_TARGETS,
            TargetSet::Extended => &Emotion::EXTENDED_TARGETS,
        }
    }
}

/// Frame pipeline cadence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scheduling period between ticks, in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 10 }
    }
}

/// Scoring game switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// When false the application only shows the live readout
    pub enabled: bool,
    pub target_set: TargetSet,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_set: TargetSet::default(),
        }
    }
}

/// Display feed options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Draw the classifier's face box on the frame
    pub draw_face_box: bool,
    /// Also draw boxes from a secondary face detector
    pub secondary_detector: bool,
    /// Number of entries in the leaderboard view
    pub leaderboard_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            draw_face_box: true,
            secondary_detector: false,
            leaderboard_size: crate::leaderboard::DEFAULT_VIEW_SIZE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `emote.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub leaderboard_path: PathBuf,
    pub pipeline: PipelineConfig,
    pub game: GameConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            leaderboard_path: PathBuf::from(DEFAULT_LEADERBOARD_FILE),
            pipeline: PipelineConfig::default(),
            game: GameConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file, using built-in defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.tick_interval_ms == 0 {
            return Err(Error::Config("pipeline.tick_interval_ms must be > 0".to_string()));
        }
        if self.display.canvas_width == 0 || self.display.canvas_height == 0 {
            return Err(Error::Config("display canvas size must be non-zero".to_string()));
        }
        if self.display.leaderboard_size == 0 {
            return Err(Error::Config("display.leaderboard_size must be > 0".to_string()));
        }
        if self.leaderboard_path.as_os_str().is_empty() {
            return Err(Error::Config("leaderboard_path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locate the config file
///
/// CLI argument, then `EMOTE_CONFIG`, then `<config_dir>/emote/config.toml`
/// if it exists. `None` means "use defaults".
pub fn resolve_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    dirs::config_dir()
        .map(|d| d.join("emote").join("config.toml"))
        .filter(|path| path.exists())
}

/// Resolve the leaderboard file path
///
/// CLI argument, then `EMOTE_LEADERBOARD`, then the TOML setting (which
/// already carries the built-in default when absent from the file).
pub fn resolve_leaderboard_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(LEADERBOARD_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    config.leaderboard_path.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.pipeline.tick_interval_ms, 10);
        assert!(config.game.enabled);
        assert_eq!(config.game.target_set, TargetSet::Extended);
        assert_eq!(config.display.canvas_width, 800);
        assert_eq!(config.display.canvas_height, 600);
        assert_eq!(config.display.leaderboard_size, 10);
        assert_eq!(config.leaderboard_path, PathBuf::from("leaderboard.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [game]
            target_set = "classic"
            "#,
        )
        .unwrap();

        assert_eq!(config.game.target_set, TargetSet::Classic);
        assert!(config.game.enabled);
        assert_eq!(config.pipeline.tick_interval_ms, 10);
    }

    #[test]
    fn test_target_sets() {
        assert_eq!(TargetSet::Classic.emotions().len(), 4);
        assert!(!TargetSet::Classic.emotions().contains(&Emotion::Fear));
        assert_eq!(TargetSet::Extended.emotions().len(), 6);
        assert!(!TargetSet::Extended.emotions().contains(&Emotion::Neutral));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TomlConfig::from_toml_str("[pipeline]\ntick_interval_ms = 0\n").is_err());
        assert!(TomlConfig::from_toml_str("[display]\ncanvas_width = 0\n").is_err());
        assert!(TomlConfig::from_toml_str("[game]\ntarget_set = \"everything\"\n").is_err());
        assert!(TomlConfig::from_toml_str("not toml at all [").is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = TomlConfig::load(None).unwrap();
        assert_eq!(config, TomlConfig::default());
    }
}
