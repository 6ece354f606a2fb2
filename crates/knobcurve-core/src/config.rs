use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{curve::KeyframeInterpolation, display::DEFAULT_MAX_STEP_PX};

pub const CONFIG_PATH_ENV: &str = "KNOBCURVE_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "knobcurve.config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub undo: UndoConfig,
    pub curves: CurvesConfig,
    pub display: DisplayConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UndoConfig {
    /// Zero keeps every entry.
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CurvesConfig {
    pub default_interpolation: KeyframeInterpolation,
    pub auto_keying: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_width: f64,
    pub max_step_px: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub log_dir: PathBuf,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { limit: 200 }
    }
}

impl Default for CurvesConfig {
    fn default() -> Self {
        Self {
            default_interpolation: KeyframeInterpolation::Smooth,
            auto_keying: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_width: 800.0,
            max_step_px: DEFAULT_MAX_STEP_PX,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: "info,knobcurve_core=trace".to_string(),
            trace_file_prefix: "knobcurve".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))?;

        Ok(config)
    }

    /// Like [`EngineConfig::load`], falling back to defaults when no file is found or it is unreadable.
    #[must_use]
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|error| {
            warn!(error = %format!("{error:#}"), "using default engine config");
            Self::default()
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
