//! Script compilation
//!
//! [`ToolchainCompiler`] turns one script source into a dynamic library by
//! invoking `rustc` directly. Output goes to a `.partial` file next to the
//! artifact and is renamed into place only on success, so a failed build never
//! disturbs the previous artifact.

use crate::descriptor::crate_name;
use crate::error::{Result, ScriptError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Longest stderr excerpt carried in a [`ScriptError::CompileFailure`]
const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// Produces a loadable artifact from a script source
pub trait ScriptCompiler: Send + Sync {
    /// Build `source` into `artifact`, creating the artifact directory if needed.
    ///
    /// Success means the toolchain reported success; on failure the previous
    /// artifact (if any) must be left untouched.
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()>;
}

/// Toolchain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler executable
    pub program: String,
    pub edition: String,
    pub opt_level: String,
    /// Extra `-L` search paths
    pub search_paths: Vec<PathBuf>,
    /// `--extern name=path` entries, typically `void_script_api`
    pub externs: BTreeMap<String, PathBuf>,
    /// Appended verbatim before the source path
    pub extra_flags: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "rustc".to_string(),
            edition: "2021".to_string(),
            opt_level: "2".to_string(),
            search_paths: Vec::new(),
            externs: BTreeMap::new(),
            extra_flags: Vec::new(),
        }
    }
}

/// Compiles scripts with an external `rustc`
#[derive(Debug, Clone, Default)]
pub struct ToolchainCompiler {
    config: CompilerConfig,
}

impl ToolchainCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Arguments for building `source` into `output`
    pub fn args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let name = source
            .file_stem()
            .and_then(|s| s.to_str())
            .map(crate_name)
            .unwrap_or_else(|| "script".to_string());

        let mut args: Vec<OsString> = vec![
            "--crate-type".into(),
            "cdylib".into(),
            "--crate-name".into(),
            name.into(),
            "--edition".into(),
            self.config.edition.clone().into(),
            "-C".into(),
            format!("opt-level={}", self.config.opt_level).into(),
        ];

        for path in &self.config.search_paths {
            args.push("-L".into());
            args.push(path.clone().into_os_string());
        }

        for (name, path) in &self.config.externs {
            let mut entry = OsString::from(format!("{}=", name));
            entry.push(path);
            args.push("--extern".into());
            args.push(entry);
        }

        args.extend(self.config.extra_flags.iter().map(OsString::from));
        args.push(source.as_os_str().to_owned());
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl ScriptCompiler for ToolchainCompiler {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
        if let Some(dir) = artifact.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let partial = partial_path(artifact);
        let program = &self.config.program;
        log::info!("Compiling script {} -> {}", source.display(), artifact.display());

        let output = Command::new(program)
            .args(self.args(source, &partial))
            .output()
            .map_err(|e| {
                ScriptError::compile_failure(source, format!("failed to run '{}': {}", program, e))
            })?;

        if !output.status.success() {
            let _ = fs::remove_file(&partial);
            let stderr = String::from_utf8_lossy(&output.stderr);
            for line in stderr.lines() {
                log::warn!(target: "script_compiler", "{}", line);
            }
            return Err(ScriptError::compile_failure(
                source,
                format!("{} exited with {}\n{}", program, output.status, excerpt(&stderr)),
            ));
        }

        if let Err(e) = fs::rename(&partial, artifact) {
            let _ = fs::remove_file(&partial);
            return Err(ScriptError::compile_failure(
                source,
                format!("failed to move artifact into place: {}", e),
            ));
        }

        log::debug!("Compiled {}", artifact.display());
        Ok(())
    }
}

/// `<artifact>.partial`, in the same directory so the final rename is atomic
pub fn partial_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn excerpt(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_DIAGNOSTIC_LEN {
        return trimmed;
    }
    let mut end = MAX_DIAGNOSTIC_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}
