//! Host binding and capability lookup
//!
//! A script never holds a pointer to its host object. It holds a [`HostId`]
//! (generation-counted index) and reaches sibling components through a
//! [`ScriptContext`] that re-checks liveness on every access.

use std::any::{Any, TypeId};

/// Generation-counted reference to a host object
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId {
    pub index: u32,
    pub generation: u32,
}

impl HostId {
    pub const INVALID: Self = Self { index: u32::MAX, generation: 0 };

    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn is_valid(&self) -> bool {
        self.index != u32::MAX
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// The object model a script's host lives in.
///
/// Implemented by the host application; scripts only see it through
/// [`ScriptContext`].
pub trait HostAccess {
    /// Whether `host` still refers to a live object
    fn is_alive(&self, host: HostId) -> bool;

    /// Look up a component of the given type on `host`
    fn component_mut(&mut self, host: HostId, type_id: TypeId) -> Option<&mut dyn Any>;

    /// Forward a log line from a script
    fn log(&self, _host: HostId, _message: &str) {}
}

/// Per-call view of the host handed to lifecycle hooks
pub struct ScriptContext<'a> {
    host: HostId,
    access: &'a mut dyn HostAccess,
}

impl<'a> ScriptContext<'a> {
    pub fn new(host: HostId, access: &'a mut dyn HostAccess) -> Self {
        Self { host, access }
    }

    /// The host object this script is bound to
    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn is_host_alive(&self) -> bool {
        self.access.is_alive(self.host)
    }

    /// Sibling component lookup, `None` once the host is gone
    pub fn get_component<T: Any>(&mut self) -> Option<&mut T> {
        if !self.access.is_alive(self.host) {
            return None;
        }
        self.access
            .component_mut(self.host, TypeId::of::<T>())?
            .downcast_mut::<T>()
    }

    pub fn log(&self, message: &str) {
        self.access.log(self.host, message);
    }
}
