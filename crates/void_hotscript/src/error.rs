//! Error types for the script hot-reload system

use std::path::{Path, PathBuf};
use thiserror::Error;
use void_script_api::ScriptFault;

/// Result type for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Errors surfaced by [`ScriptComponent`](crate::ScriptComponent) operations
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Source file for the attached script does not exist
    #[error("Script source '{0}' does not exist")]
    SourceMissing(PathBuf),

    /// Toolchain could not be started or reported failure
    #[error("Failed to compile '{path}': {message}")]
    CompileFailure {
        path: PathBuf,
        message: String,
    },

    /// Artifact missing or could not be opened
    #[error("Failed to load script module: {0}")]
    LoadFailure(LoadError),

    /// Module does not honor the script contract
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Factory, binding or OnCreate failed
    #[error("Failed to construct script '{script}': {message}")]
    ConstructionFailure {
        script: String,
        message: String,
    },

    /// Script code panicked during a lifecycle hook
    #[error("Script '{script}' faulted: {fault}")]
    ScriptFault {
        script: String,
        fault: ScriptFault,
    },

    /// Operation needs an attached script
    #[error("No script attached")]
    NotAttached,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    pub fn source_missing(path: impl AsRef<Path>) -> Self {
        Self::SourceMissing(path.as_ref().to_path_buf())
    }

    pub fn compile_failure(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::CompileFailure {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn construction_failure(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstructionFailure {
            script: script.into(),
            message: message.into(),
        }
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    pub fn script_fault(script: impl Into<String>, fault: ScriptFault) -> Self {
        Self::ScriptFault {
            script: script.into(),
            fault,
        }
    }
}

/// Errors from a [`ModuleLoader`](crate::ModuleLoader)
#[derive(Debug, Error)]
pub enum LoadError {
    /// No artifact at the given path
    #[error("Compiled artifact '{0}' does not exist")]
    MissingArtifact(PathBuf),

    /// Platform loader rejected the file
    #[error("Failed to open module '{path}': {message}")]
    OpenFailure {
        path: PathBuf,
        message: String,
    },

    /// A required entry point is absent
    #[error("Module '{path}' does not export required symbol '{symbol}'")]
    ContractViolation {
        path: PathBuf,
        symbol: String,
    },
}

impl LoadError {
    pub fn open_failure(path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::OpenFailure {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn missing_symbol(path: impl AsRef<Path>, symbol: &[u8]) -> Self {
        let symbol = symbol.strip_suffix(b"\0").unwrap_or(symbol);
        Self::ContractViolation {
            path: path.as_ref().to_path_buf(),
            symbol: String::from_utf8_lossy(symbol).into_owned(),
        }
    }
}

impl From<LoadError> for ScriptError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::ContractViolation { .. } => ScriptError::ContractViolation(err.to_string()),
            other => ScriptError::LoadFailure(other),
        }
    }
}

/// Errors while reading `void_script.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_is_distinct() {
        let err: ScriptError = LoadError::missing_symbol("a.so", b"void_destroy_script\0").into();
        match err {
            ScriptError::ContractViolation(message) => {
                assert!(message.contains("void_destroy_script"));
                assert!(!message.contains('\0'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_open_failure_is_load_failure() {
        let err: ScriptError = LoadError::open_failure("a.so", "bad magic").into();
        assert!(matches!(err, ScriptError::LoadFailure(LoadError::OpenFailure { .. })));
        assert!(err.to_string().contains("bad magic"));
    }
}
