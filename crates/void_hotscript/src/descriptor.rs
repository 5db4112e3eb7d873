//! Script naming and on-disk layout

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where script sources live and where their artifacts go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLayout {
    /// Directory holding `<name>.<source_extension>`
    pub scripts_dir: PathBuf,
    /// Directory receiving compiled modules
    pub compiled_dir: PathBuf,
    /// Source file extension, without the dot
    pub source_extension: String,
}

impl Default for ScriptLayout {
    fn default() -> Self {
        Self::rooted("scripts")
    }
}

impl ScriptLayout {
    /// Layout with sources in `scripts_dir` and artifacts in `scripts_dir/compiled`
    pub fn rooted(scripts_dir: impl Into<PathBuf>) -> Self {
        let scripts_dir = scripts_dir.into();
        Self {
            compiled_dir: scripts_dir.join("compiled"),
            scripts_dir,
            source_extension: "rs".to_string(),
        }
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.scripts_dir
            .join(format!("{}.{}", name, self.source_extension))
    }

    /// Artifact path, using the platform's dynamic library extension
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.compiled_dir
            .join(format!("{}.{}", name, std::env::consts::DLL_EXTENSION))
    }

    /// Script name for a path inside `scripts_dir`, if it is a script source
    pub fn script_name(&self, path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != self.source_extension {
            return None;
        }
        let parent = path.parent()?;
        if !same_dir(parent, &self.scripts_dir) {
            return None;
        }
        path.file_stem()?.to_str().map(str::to_string)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// A script attachment: name, resolved paths and last successful build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    pub name: String,
    pub source_path: PathBuf,
    pub artifact_path: PathBuf,
    /// Source modification time observed before the last successful build
    pub last_compile: Option<SystemTime>,
}

impl ScriptDescriptor {
    pub fn new(name: impl Into<String>, layout: &ScriptLayout) -> Self {
        let name = name.into();
        Self {
            source_path: layout.source_path(&name),
            artifact_path: layout.artifact_path(&name),
            name,
            last_compile: None,
        }
    }

    /// Current modification time of the source, `None` if it is missing
    pub fn source_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.source_path)
            .and_then(|meta| meta.modified())
            .ok()
    }
}

/// Crate name rustc will accept for a script name.
///
/// `PlayerController` becomes `player_controller`.
pub fn crate_name(script: &str) -> String {
    let mut out = String::with_capacity(script.len() + 4);
    let mut prev_lower = false;
    for c in script.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "script_");
    }
    out
}
