//! The script base contract
//!
//! [`Script`] is what users implement. [`ScriptObject`] is what actually
//! crosses the module boundary: the same capability set, but every call
//! reports failure as a value instead of unwinding.

use crate::host::ScriptContext;
use crate::property::{PropertyDescriptor, PropertyMut};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Behavior every script variant implements.
pub trait Script {
    /// Called exactly once, after construction and after the host binding is set
    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {}

    /// Called once per simulation tick while bound and active
    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>, _dt: f32) {}

    /// Called exactly once, before destruction, while the module is loaded
    fn on_destroy(&mut self) {}

    /// Stable, ordered list of reflectable fields
    fn properties(&self) -> &'static [PropertyDescriptor];

    /// Mutable view of a named field, `None` for unknown names
    fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>>;
}

/// A panic or other failure raised inside script code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFault {
    /// Human-readable description
    pub message: String,
}

impl ScriptFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Extract the message from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self { message }
    }
}

impl fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script panicked: {}", self.message)
    }
}

impl std::error::Error for ScriptFault {}

/// The object carried by a [`ScriptHandle`](crate::ScriptHandle).
///
/// Implementations must never unwind out of these methods.
pub trait ScriptObject {
    fn create(&mut self, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptFault>;
    fn update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) -> Result<(), ScriptFault>;
    fn destroy(&mut self) -> Result<(), ScriptFault>;
    fn properties(&self) -> &'static [PropertyDescriptor];
    fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>>;
    /// Concrete type name, for diagnostics
    fn type_name(&self) -> &'static str;
}

/// Adapter that runs a [`Script`] under `catch_unwind`.
pub struct Guarded<T> {
    inner: T,
}

impl<T: Script> Guarded<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Script + 'static> ScriptObject for Guarded<T> {
    fn create(&mut self, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptFault> {
        let inner = &mut self.inner;
        panic::catch_unwind(AssertUnwindSafe(move || inner.on_create(ctx)))
            .map_err(ScriptFault::from_panic)
    }

    fn update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) -> Result<(), ScriptFault> {
        let inner = &mut self.inner;
        panic::catch_unwind(AssertUnwindSafe(move || inner.on_update(ctx, dt)))
            .map_err(ScriptFault::from_panic)
    }

    fn destroy(&mut self) -> Result<(), ScriptFault> {
        let inner = &mut self.inner;
        panic::catch_unwind(AssertUnwindSafe(move || inner.on_destroy()))
            .map_err(ScriptFault::from_panic)
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        let inner = &self.inner;
        panic::catch_unwind(AssertUnwindSafe(move || inner.properties())).unwrap_or(&[])
    }

    fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
        let inner = &mut self.inner;
        panic::catch_unwind(AssertUnwindSafe(move || {
            // Rebind so the closure consumes the borrow and the view can escape it
            let inner = inner;
            inner.property_mut(name)
        }))
        .ok()
        .flatten()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
