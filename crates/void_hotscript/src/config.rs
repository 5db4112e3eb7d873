//! Script host configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (`VOID_SCRIPT_*`)
//! 2. Config file: `void_script.toml` or `config/void_script.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! tick_rate_hz = 60.0
//!
//! [layout]
//! scripts_dir = "scripts"
//! compiled_dir = "scripts/compiled"
//!
//! [compiler]
//! program = "rustc"
//! opt_level = "2"
//! search_paths = ["target/debug/deps"]
//! externs = { void_script_api = "target/debug/libvoid_script_api.rlib" }
//!
//! [loader]
//! shadow_copy = true
//!
//! [hot_reload]
//! enabled = true
//! debounce_ms = 200
//!
//! [[scripts]]
//! object = "Player"
//! script = "PlayerController"
//! ```

use crate::compiler::CompilerConfig;
use crate::descriptor::ScriptLayout;
use crate::error::ConfigError;
use crate::loader::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files tried by [`ScriptConfig::load`], first match wins
pub const CONFIG_SEARCH_PATHS: &[&str] = &["void_script.toml", "config/void_script.toml"];

/// Hot-reload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Watch the scripts directory instead of checking every tick
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 200,
        }
    }
}

/// A script to attach to a freshly spawned host object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAttachment {
    /// Host object name
    pub object: String,
    /// Script name, resolved through the layout
    pub script: String,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub layout: ScriptLayout,
    pub compiler: CompilerConfig,
    pub loader: LoaderConfig,
    pub hot_reload: HotReloadConfig,
    pub tick_rate_hz: f32,
    pub scripts: Vec<ScriptAttachment>,
    /// File this config was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            layout: ScriptLayout::default(),
            compiler: CompilerConfig::default(),
            loader: LoaderConfig::default(),
            hot_reload: HotReloadConfig::default(),
            tick_rate_hz: 60.0,
            scripts: Vec::new(),
            config_path: None,
        }
    }
}

impl ScriptConfig {
    /// Load configuration from all sources
    pub fn load() -> Self {
        let mut config = Self::default();

        for path in CONFIG_SEARCH_PATHS {
            let path = Path::new(path);
            if !path.is_file() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(loaded) => {
                    config = loaded;
                    log::info!("Loaded script config from {}", path.display());
                    break;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        config.apply_env();
        config
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override with `VOID_SCRIPT_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("VOID_SCRIPT_DIR").filter(|v| !v.is_empty()) {
            let source_extension = std::mem::take(&mut self.layout.source_extension);
            self.layout = ScriptLayout {
                source_extension,
                ..ScriptLayout::rooted(dir)
            };
            log::info!("Script directory from env: {}", self.layout.scripts_dir.display());
        }

        if let Some(program) = var("VOID_SCRIPT_RUSTC").filter(|v| !v.is_empty()) {
            self.compiler.program = program;
        }

        if let Some(rlib) = var("VOID_SCRIPT_API_RLIB").filter(|v| !v.is_empty()) {
            let rlib = PathBuf::from(rlib);
            if let Some(deps) = rlib.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !self.compiler.search_paths.iter().any(|p| p == deps) {
                    self.compiler.search_paths.push(deps.to_path_buf());
                }
            }
            self.compiler.externs.insert("void_script_api".to_string(), rlib);
        }

        if let Some(flag) = var("VOID_SCRIPT_HOT_RELOAD") {
            self.hot_reload.enabled = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.hot_reload.debounce_ms)
    }

    /// Time between simulation ticks
    pub fn tick_interval(&self) -> Duration {
        let fallback = Duration::from_secs_f32(1.0 / 60.0);
        if self.tick_rate_hz > 0.0 {
            Duration::try_from_secs_f32(1.0 / self.tick_rate_hz).unwrap_or(fallback)
        } else {
            fallback
        }
    }

    /// Log the effective configuration
    pub fn print_summary(&self) {
        log::info!("Script configuration:");
        if let Some(path) = &self.config_path {
            log::info!("  Source: {}", path.display());
        }
        log::info!("  Scripts: {}", self.layout.scripts_dir.display());
        log::info!("  Artifacts: {}", self.layout.compiled_dir.display());
        log::info!("  Compiler: {}", self.compiler.program);
        log::info!("  Hot-reload: {}", self.hot_reload.enabled);
        log::info!("  Attachments: {}", self.scripts.len());
    }
}
