//! Module loading
//!
//! A [`ScriptModule`] is one opened artifact with its two resolved entry
//! points. Instances hold an `Arc` to the module that created them, so the
//! library cannot be closed while any of its objects is alive.

use crate::error::LoadError;
use libloading::Library;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use void_script_api::ffi::{
    CreateScriptFn, DestroyScriptFn, CREATE_SCRIPT_SYMBOL, DESTROY_SCRIPT_SYMBOL,
};

/// The two entry points every script module exports
#[derive(Debug, Clone, Copy)]
pub struct ModuleExports {
    pub create: CreateScriptFn,
    pub destroy: DestroyScriptFn,
}

/// Whatever keeps a module's code mapped. Dropping it closes the module.
pub trait ModuleBacking: Send + Sync {}

/// An opened script module
pub struct ScriptModule {
    path: PathBuf,
    exports: ModuleExports,
    // Dropped last; never read, only held
    _backing: Box<dyn ModuleBacking>,
}

impl ScriptModule {
    /// Wrap resolved entry points and the resource keeping them valid.
    ///
    /// # Safety
    /// `exports` must stay callable for as long as `backing` is alive.
    pub unsafe fn new(
        path: impl Into<PathBuf>,
        exports: ModuleExports,
        backing: Box<dyn ModuleBacking>,
    ) -> Self {
        Self {
            path: path.into(),
            exports,
            _backing: backing,
        }
    }

    /// Artifact this module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exports(&self) -> &ModuleExports {
        &self.exports
    }
}

impl fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptModule")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for ScriptModule {
    fn drop(&mut self) {
        log::debug!("Closing script module {}", self.path.display());
    }
}

/// Opens artifacts and resolves the script entry points
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<ScriptModule>, LoadError>;
}

/// Release the component's reference to its module.
///
/// Idempotent. Returns whether the module was actually closed; if an instance
/// still holds a reference the close is deferred until it goes away.
pub fn unload(module: &mut Option<Arc<ScriptModule>>) -> bool {
    let Some(module) = module.take() else {
        return false;
    };
    match Arc::try_unwrap(module) {
        Ok(module) => {
            drop(module);
            true
        }
        Err(shared) => {
            log::warn!(
                "Script module {} is still referenced ({} holders); close deferred",
                shared.path.display(),
                Arc::strong_count(&shared) - 1
            );
            false
        }
    }
}

/// Loader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Open a uniquely named copy instead of the artifact itself.
    ///
    /// Platform loaders may cache by path and hand back stale code after a
    /// rebuild; a fresh name sidesteps that and keeps the artifact writable
    /// on platforms that lock loaded libraries.
    pub shadow_copy: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { shadow_copy: true }
    }
}

/// Loads script modules with `libloading`
pub struct DylibLoader {
    config: LoaderConfig,
    shadow_dir: PathBuf,
    counter: AtomicU64,
}

impl DylibLoader {
    /// `shadow_dir` receives the per-load copies when shadow copying is on
    pub fn new(config: LoaderConfig, shadow_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            shadow_dir: shadow_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    fn shadow_path(&self, artifact: &Path) -> PathBuf {
        let stem = artifact
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("script");
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.shadow_dir.join(format!(
            "{}-{}-{}.{}",
            stem,
            std::process::id(),
            n,
            std::env::consts::DLL_EXTENSION
        ))
    }

    fn shadow_copy(&self, artifact: &Path) -> Result<PathBuf, LoadError> {
        fs::create_dir_all(&self.shadow_dir).map_err(|e| LoadError::open_failure(artifact, e))?;
        let shadow = self.shadow_path(artifact);
        fs::copy(artifact, &shadow).map_err(|e| LoadError::open_failure(artifact, e))?;
        Ok(shadow)
    }
}

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Arc<ScriptModule>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::MissingArtifact(path.to_path_buf()));
        }

        let shadow = if self.config.shadow_copy {
            Some(self.shadow_copy(path)?)
        } else {
            None
        };
        let open_path = shadow.as_deref().unwrap_or(path);

        let library = match unsafe { Library::new(open_path) } {
            Ok(library) => library,
            Err(e) => {
                if let Some(shadow) = &shadow {
                    let _ = fs::remove_file(shadow);
                }
                return Err(LoadError::open_failure(path, e));
            }
        };

        // From here on, dropping `backing` closes the library and removes the copy
        let backing = DylibBacking {
            library: Some(library),
            shadow,
        };
        let exports = backing.resolve(path)?;

        log::info!("Loaded script module {}", path.display());
        Ok(Arc::new(unsafe { ScriptModule::new(path, exports, Box::new(backing)) }))
    }
}

struct DylibBacking {
    library: Option<Library>,
    shadow: Option<PathBuf>,
}

impl DylibBacking {
    fn resolve(&self, path: &Path) -> Result<ModuleExports, LoadError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| LoadError::open_failure(path, "library already closed"))?;

        let create = unsafe { library.get::<CreateScriptFn>(CREATE_SCRIPT_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|_| LoadError::missing_symbol(path, CREATE_SCRIPT_SYMBOL))?;
        let destroy = unsafe { library.get::<DestroyScriptFn>(DESTROY_SCRIPT_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|_| LoadError::missing_symbol(path, DESTROY_SCRIPT_SYMBOL))?;

        Ok(ModuleExports { create, destroy })
    }
}

impl ModuleBacking for DylibBacking {}

impl Drop for DylibBacking {
    fn drop(&mut self) {
        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                log::error!("Failed to close script library: {}", e);
            }
        }
        if let Some(shadow) = self.shadow.take() {
            if let Err(e) = fs::remove_file(&shadow) {
                log::debug!("Could not remove shadow copy {}: {}", shadow.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use void_script_api::ScriptHandle;

    unsafe extern "C" fn create_null() -> ScriptHandle {
        ScriptHandle::null()
    }

    unsafe extern "C" fn destroy_noop(_handle: ScriptHandle) {}

    struct FlagBacking(Arc<AtomicBool>);

    impl ModuleBacking for FlagBacking {}

    impl Drop for FlagBacking {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn module(closed: &Arc<AtomicBool>) -> Arc<ScriptModule> {
        let exports = ModuleExports {
            create: create_null,
            destroy: destroy_noop,
        };
        Arc::new(unsafe {
            ScriptModule::new("stub.so", exports, Box::new(FlagBacking(closed.clone())))
        })
    }

    #[test]
    fn test_unload_is_idempotent() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut slot = Some(module(&closed));

        assert!(unload(&mut slot));
        assert!(closed.load(Ordering::SeqCst));
        assert!(slot.is_none());
        assert!(!unload(&mut slot));
    }

    #[test]
    fn test_unload_deferred_while_referenced() {
        let closed = Arc::new(AtomicBool::new(false));
        let module = module(&closed);
        let held = Arc::clone(&module);
        let mut slot = Some(module);

        assert!(!unload(&mut slot));
        assert!(!closed.load(Ordering::SeqCst));
        drop(held);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DylibLoader::new(LoaderConfig::default(), dir.path().join("shadow"));
        let err = loader.load(&dir.path().join("Missing.so")).unwrap_err();
        assert!(matches!(err, LoadError::MissingArtifact(_)));
    }

    #[test]
    fn test_garbage_artifact_is_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("Garbage.so");
        fs::write(&artifact, b"definitely not a shared object").unwrap();

        let shadow_dir = dir.path().join("shadow");
        let loader = DylibLoader::new(LoaderConfig::default(), &shadow_dir);
        let err = loader.load(&artifact).unwrap_err();
        assert!(matches!(err, LoadError::OpenFailure { .. }));

        // The shadow copy does not outlive a failed open
        let leftovers = fs::read_dir(&shadow_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_shadow_paths_are_unique() {
        let loader = DylibLoader::new(LoaderConfig::default(), "shadow");
        let a = loader.shadow_path(Path::new("compiled/Foo.so"));
        let b = loader.shadow_path(Path::new("compiled/Foo.so"));
        assert_ne!(a, b);
        assert!(a.starts_with("shadow"));
    }
}
