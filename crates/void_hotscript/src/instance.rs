//! Live script instances
//!
//! A [`ScriptInstance`] owns one object created by a module's factory. It
//! keeps the module alive, tracks how far the object got through its
//! lifecycle and guarantees that teardown runs `on_destroy` (only if
//! `on_create` completed) followed by the module's destroyer, exactly once.

use crate::error::{Result, ScriptError};
use crate::loader::ScriptModule;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use void_script_api::{
    HostAccess, HostId, PropertyMut, PropertyType, ScriptContext, ScriptFault, ScriptHandle,
    ScriptObject,
};

/// Lifecycle state of an attached script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptState {
    /// Nothing loaded
    Unloaded,
    /// Toolchain running
    Compiling,
    /// Factory returned an object, not yet bound to a host
    Constructed,
    /// Host binding set, `on_create` not yet run
    Bound,
    /// `on_create` completed; receives updates
    Active,
    /// Teardown in progress
    Destroying,
}

impl ScriptState {
    pub fn is_active(&self) -> bool {
        matches!(self, ScriptState::Active)
    }
}

/// Reference from an instance to the object it is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBinding {
    pub host: HostId,
}

/// Copy of one reflected property, safe to keep after the module is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: PropertyType,
}

/// Run `f`, turning a panic into a [`ScriptFault`]
pub fn catch_panic<F, R>(f: F) -> std::result::Result<R, ScriptFault>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(ScriptFault::from_panic)
}

/// One script object and the module that produced it
pub struct ScriptInstance {
    handle: ScriptHandle,
    state: ScriptState,
    binding: Option<HostBinding>,
    name: String,
    // Released after the destroyer has run
    module: Arc<ScriptModule>,
}

impl ScriptInstance {
    /// Call the module's factory.
    ///
    /// A null result is a construction failure; a handle stamped with another
    /// contract version is handed straight back to the destroyer without any
    /// hook being called.
    pub fn construct(module: &Arc<ScriptModule>, name: &str) -> Result<Self> {
        let handle = unsafe { (module.exports().create)() };

        if handle.is_null() {
            return Err(ScriptError::construction_failure(
                name,
                "factory returned no instance",
            ));
        }

        if !handle.abi_matches() {
            let version = handle.abi_version;
            unsafe { (module.exports().destroy)(handle) };
            return Err(ScriptError::contract_violation(format!(
                "module {} was built against script ABI v{}, host expects v{}",
                module.path().display(),
                version,
                void_script_api::SCRIPT_ABI_VERSION
            )));
        }

        log::debug!("Constructed script '{}'", name);
        Ok(Self {
            handle,
            state: ScriptState::Constructed,
            binding: None,
            name: name.to_string(),
            module: Arc::clone(module),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn binding(&self) -> Option<HostBinding> {
        self.binding
    }

    pub fn module(&self) -> &Arc<ScriptModule> {
        &self.module
    }

    fn object(&mut self) -> Option<&mut dyn ScriptObject> {
        // The handle is nulled on destroy and the module is held by `self`
        unsafe { self.handle.object_mut() }
    }

    /// Concrete script type, for diagnostics
    pub fn type_name(&mut self) -> Option<&'static str> {
        self.object().map(|object| object.type_name())
    }

    /// Attach to `host`, which must be alive
    pub fn bind(&mut self, host: HostId, world: &dyn HostAccess) -> Result<()> {
        if self.state != ScriptState::Constructed {
            return Err(ScriptError::construction_failure(
                &self.name,
                format!("cannot bind from state {:?}", self.state),
            ));
        }
        if !world.is_alive(host) {
            return Err(ScriptError::construction_failure(
                &self.name,
                format!("host object {:?} no longer exists", host),
            ));
        }
        self.binding = Some(HostBinding { host });
        self.state = ScriptState::Bound;
        Ok(())
    }

    /// Run `on_create`. A fault leaves the instance bound but never active.
    pub fn create(&mut self, world: &mut dyn HostAccess) -> Result<()> {
        let Some(HostBinding { host }) = self.binding else {
            return Err(ScriptError::construction_failure(&self.name, "not bound to a host"));
        };
        if self.state != ScriptState::Bound {
            return Err(ScriptError::construction_failure(
                &self.name,
                format!("cannot run on_create from state {:?}", self.state),
            ));
        }

        let name = self.name.clone();
        let object = self
            .object()
            .ok_or_else(|| ScriptError::construction_failure(&name, "instance already destroyed"))?;
        let mut ctx = ScriptContext::new(host, world);
        match catch_panic(|| object.create(&mut ctx)).and_then(|r| r) {
            Ok(()) => {
                self.state = ScriptState::Active;
                Ok(())
            }
            Err(fault) => Err(ScriptError::construction_failure(
                name,
                format!("on_create faulted: {}", fault.message),
            )),
        }
    }

    /// Run `on_update`. No-op unless active.
    pub fn update(&mut self, world: &mut dyn HostAccess, dt: f32) -> std::result::Result<(), ScriptFault> {
        if self.state != ScriptState::Active {
            return Ok(());
        }
        let Some(HostBinding { host }) = self.binding else {
            return Ok(());
        };
        let Some(object) = self.object() else {
            return Ok(());
        };
        let mut ctx = ScriptContext::new(host, world);
        catch_panic(|| object.update(&mut ctx, dt)).and_then(|r| r)
    }

    /// Snapshot of the reflected properties, empty once destroyed
    pub fn properties(&mut self) -> Vec<PropertyInfo> {
        let Some(object) = self.object() else {
            return Vec::new();
        };
        catch_panic(|| object.properties())
            .unwrap_or(&[])
            .iter()
            .map(|desc| PropertyInfo {
                name: desc.name.to_string(),
                ty: desc.ty,
            })
            .collect()
    }

    pub fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
        self.object()?.property_mut(name)
    }

    /// Address of a named field, null for unknown names or once destroyed
    pub fn property_ptr(&mut self, name: &str) -> *mut c_void {
        self.property_mut(name)
            .map_or(ptr::null_mut(), |mut prop| prop.as_ptr())
    }

    /// Run `on_destroy` (if the script became active) and the destroyer.
    ///
    /// Idempotent. Faults in `on_destroy` are logged; destruction proceeds.
    pub fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }

        let was_active = self.state == ScriptState::Active;
        self.state = ScriptState::Destroying;

        if was_active {
            if let Some(object) = self.object() {
                if let Err(fault) = catch_panic(|| object.destroy()).and_then(|r| r) {
                    log::error!("Script '{}' faulted in on_destroy: {}", self.name, fault);
                }
            }
        }

        let handle = std::mem::replace(&mut self.handle, ScriptHandle::null());
        unsafe { (self.module.exports().destroy)(handle) };
        self.binding = None;
        self.state = ScriptState::Unloaded;
        log::debug!("Destroyed script '{}'", self.name);
    }
}

impl Drop for ScriptInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("binding", &self.binding)
            .field("module", &self.module.path())
            .finish()
    }
}
