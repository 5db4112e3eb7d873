//! The script component
//!
//! [`ScriptComponent`] attaches one hot-reloadable script to one host object.
//! It owns the whole pipeline for that script: source lookup, compilation,
//! module loading, instance construction and binding, per-tick updates,
//! change detection and teardown.
//!
//! # Ordering guarantees
//!
//! - Teardown always runs `on_destroy` (if `on_create` completed), then the
//!   module's destroyer, then closes the module.
//! - A reload closes the old module before the new artifact is opened.
//! - Any failure while loading leaves the component with no instance and no
//!   module; the previous instance is never resurrected.
//!
//! # Change detection
//!
//! The source's modification time is sampled before compiling and recorded
//! only after the new instance is active. An edit made during a build
//! therefore triggers another reload. After a failed attempt the component
//! also remembers the source time it tried, so a broken source is not rebuilt
//! every tick.

use crate::compiler::{ScriptCompiler, ToolchainCompiler};
use crate::config::ScriptConfig;
use crate::descriptor::{ScriptDescriptor, ScriptLayout};
use crate::error::{Result, ScriptError};
use crate::instance::{PropertyInfo, ScriptInstance, ScriptState};
use crate::loader::{self, DylibLoader, ModuleLoader, ScriptModule};
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::time::SystemTime;
use void_script_api::{HostAccess, HostId, PropertyMut, PropertyValue};

/// Compiler, loader and layout shared by every component of a host
#[derive(Clone)]
pub struct ScriptServices {
    pub layout: ScriptLayout,
    pub compiler: Arc<dyn ScriptCompiler>,
    pub loader: Arc<dyn ModuleLoader>,
}

impl ScriptServices {
    pub fn new(
        layout: ScriptLayout,
        compiler: Arc<dyn ScriptCompiler>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            layout,
            compiler,
            loader,
        }
    }

    /// `rustc` compiler and `libloading` loader as configured
    pub fn from_config(config: &ScriptConfig) -> Self {
        let shadow_dir = config.layout.compiled_dir.join(".shadow");
        Self {
            layout: config.layout.clone(),
            compiler: Arc::new(ToolchainCompiler::new(config.compiler.clone())),
            loader: Arc::new(DylibLoader::new(config.loader.clone(), shadow_dir)),
        }
    }
}

/// Result of [`ScriptComponent::reload_if_needed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    /// Source not newer than the last successful build
    Unchanged,
    /// Rebuilt and re-instantiated
    Reloaded,
}

/// One script attached to one host object
pub struct ScriptComponent {
    host: HostId,
    services: ScriptServices,
    descriptor: Option<ScriptDescriptor>,
    state: ScriptState,
    instance: Option<ScriptInstance>,
    module: Option<Arc<ScriptModule>>,
    /// Source time of the last failed attempt
    failed_source_time: Option<SystemTime>,
    last_diagnostic: Option<String>,
}

impl ScriptComponent {
    pub fn new(host: HostId, services: ScriptServices) -> Self {
        Self {
            host,
            services,
            descriptor: None,
            state: ScriptState::Unloaded,
            instance: None,
            module: None,
            failed_source_time: None,
            last_diagnostic: None,
        }
    }

    /// Host object this component belongs to
    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn descriptor(&self) -> Option<&ScriptDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn script_name(&self) -> Option<&str> {
        self.descriptor.as_ref().map(|d| d.name.as_str())
    }

    /// Whether a bound instance is receiving updates
    pub fn is_active(&self) -> bool {
        self.state.is_active() && self.instance.is_some()
    }

    /// Human-readable description of the most recent failure
    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }

    /// Take the most recent failure, so it is only reported once
    pub fn take_diagnostic(&mut self) -> Option<String> {
        self.last_diagnostic.take()
    }

    /// Attach `name`, replacing whatever was attached, and bring it up.
    ///
    /// On error the component is left unloaded and the reason is also kept
    /// in [`last_diagnostic`](Self::last_diagnostic).
    pub fn load_script(&mut self, name: &str, world: &mut dyn HostAccess) -> Result<()> {
        self.teardown();
        self.descriptor = Some(ScriptDescriptor::new(name, &self.services.layout));
        self.failed_source_time = None;
        self.last_diagnostic = None;
        self.compile_and_load(world)
    }

    /// Rebuild and re-instantiate if the source changed since the last build.
    ///
    /// Cheap when nothing changed: one metadata query, no toolchain run.
    pub fn reload_if_needed(&mut self, world: &mut dyn HostAccess) -> Result<ReloadStatus> {
        let descriptor = self.descriptor.as_ref().ok_or(ScriptError::NotAttached)?;

        let Some(modified) = descriptor.source_modified() else {
            let err = ScriptError::source_missing(&descriptor.source_path);
            self.last_diagnostic = Some(err.to_string());
            return Err(err);
        };

        if !self.is_stale(modified) {
            return Ok(ReloadStatus::Unchanged);
        }

        log::info!("Script '{}' changed, reloading", descriptor.name);
        self.teardown();
        self.compile_and_load(world)?;
        Ok(ReloadStatus::Reloaded)
    }

    /// Run one tick of the bound instance. No-op unless active.
    ///
    /// A fault tears the instance down; the component stays attached and
    /// reloads once the source changes.
    pub fn update(&mut self, world: &mut dyn HostAccess, dt: f32) {
        if !self.state.is_active() {
            return;
        }
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        if let Err(fault) = instance.update(world, dt) {
            let err = ScriptError::script_fault(instance.name(), fault);
            log::error!("{}", err);
            self.last_diagnostic = Some(err.to_string());
            self.teardown();
        }
    }

    /// Destroy the instance and close the module. Keeps the attachment.
    pub fn unload_script(&mut self) {
        self.teardown();
    }

    /// Reflected properties of the live instance, empty when unbound
    pub fn properties(&mut self) -> Vec<PropertyInfo> {
        self.instance
            .as_mut()
            .map(ScriptInstance::properties)
            .unwrap_or_default()
    }

    pub fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
        self.instance.as_mut()?.property_mut(name)
    }

    /// Address of a field on the live instance.
    ///
    /// Null for unknown names and whenever no instance is bound. The pointer
    /// is valid until the next reload, unload or drop of this component.
    pub fn property_ptr(&mut self, name: &str) -> *mut c_void {
        match self.instance.as_mut() {
            Some(instance) => instance.property_ptr(name),
            None => ptr::null_mut(),
        }
    }

    pub fn property_value(&mut self, name: &str) -> Option<PropertyValue> {
        self.property_mut(name).map(|prop| prop.get())
    }

    /// Write a property; false for unknown names or mismatched types
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> bool {
        self.property_mut(name)
            .map_or(false, |mut prop| prop.set(value))
    }

    fn is_stale(&self, modified: SystemTime) -> bool {
        let newer_than_build = self
            .descriptor
            .as_ref()
            .and_then(|d| d.last_compile)
            .map_or(true, |built| modified > built);
        let newer_than_failure = self
            .failed_source_time
            .map_or(true, |failed| modified > failed);
        newer_than_build && newer_than_failure
    }

    fn compile_and_load(&mut self, world: &mut dyn HostAccess) -> Result<()> {
        let descriptor = self.descriptor.clone().ok_or(ScriptError::NotAttached)?;
        let source_time = descriptor.source_modified();

        let outcome = match source_time {
            Some(_) => self.try_load(&descriptor, world),
            None => Err(ScriptError::source_missing(&descriptor.source_path)),
        };

        match outcome {
            Ok(()) => {
                if let Some(d) = self.descriptor.as_mut() {
                    d.last_compile = source_time;
                }
                self.failed_source_time = None;
                self.state = ScriptState::Active;
                log::info!("Script '{}' active on {:?}", descriptor.name, self.host);
                Ok(())
            }
            Err(err) => {
                self.teardown();
                self.failed_source_time = source_time;
                self.last_diagnostic = Some(err.to_string());
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    fn try_load(&mut self, descriptor: &ScriptDescriptor, world: &mut dyn HostAccess) -> Result<()> {
        self.state = ScriptState::Compiling;
        self.services
            .compiler
            .compile(&descriptor.source_path, &descriptor.artifact_path)?;

        let module = self.services.loader.load(&descriptor.artifact_path)?;
        self.module = Some(Arc::clone(&module));

        let mut instance = ScriptInstance::construct(&module, &descriptor.name)?;
        self.state = ScriptState::Constructed;

        instance.bind(self.host, world)?;
        self.state = ScriptState::Bound;

        instance.create(world)?;
        self.instance = Some(instance);
        Ok(())
    }

    /// Destroy the instance (if any), then release the module
    fn teardown(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            self.state = ScriptState::Destroying;
            instance.destroy();
        }
        loader::unload(&mut self.module);
        self.state = ScriptState::Unloaded;
    }
}

impl Drop for ScriptComponent {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ScriptComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptComponent")
            .field("host", &self.host)
            .field("script", &self.script_name())
            .field("state", &self.state)
            .finish()
    }
}
