//! # void_script_api - Hot Script Contract
//!
//! The binary contract between the Void hot-script host and user scripts that
//! are compiled separately into dynamic libraries and loaded at runtime.
//!
//! ## Overview
//!
//! A script is a single Rust source file compiled as a `cdylib`. It implements
//! [`Script`] and exports itself with [`export_script!`], which generates the
//! only two symbols the host ever resolves:
//!
//! | Symbol                 | Signature                                   |
//! |------------------------|---------------------------------------------|
//! | `void_create_script`   | `unsafe extern "C" fn() -> ScriptHandle`    |
//! | `void_destroy_script`  | `unsafe extern "C" fn(ScriptHandle)`        |
//!
//! Everything else (lifecycle hooks, property reflection, component lookup)
//! travels through the [`ScriptObject`] trait object carried by the handle.
//!
//! ## Compatibility requirement
//!
//! Rust has no stable ABI for trait objects. The host and every script MUST be
//! built by the same `rustc` against the same build of this crate:
//!
//! - the vtable layout of `dyn ScriptObject` is compiler-defined,
//! - [`ScriptContext::get_component`] matches components by `TypeId`, which is
//!   only stable for the same crate build,
//! - strings and boxes cross the boundary in both directions, so scripts must
//!   use the system allocator (no `#[global_allocator]` in a script).
//!
//! [`SCRIPT_ABI_VERSION`] is stamped into every [`ScriptHandle`] and catches
//! drift in this contract. Compiler drift cannot be detected at runtime and is
//! the responsibility of whoever configures the toolchain.
//!
//! ## Panics
//!
//! Panics never unwind across the boundary. [`export_script!`] wraps the user
//! type in [`Guarded`], which runs every hook under `catch_unwind` inside the
//! module and reports failures as [`ScriptFault`] values.
//!
//! ## Example
//!
//! ```ignore
//! use void_script_api::prelude::*;
//!
//! #[derive(Default)]
//! struct Spinner { speed: f32 }
//!
//! impl Script for Spinner {
//!     fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) {
//!         if let Some(transform) = ctx.get_component::<Transform>() {
//!             transform.rotation[1] += self.speed * dt;
//!         }
//!     }
//!
//!     fn properties(&self) -> &'static [PropertyDescriptor] {
//!         const PROPS: &[PropertyDescriptor] = &[PropertyDescriptor::new("Speed", PropertyType::Float)];
//!         PROPS
//!     }
//!
//!     fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
//!         match name {
//!             "Speed" => Some(PropertyMut::Float(&mut self.speed)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! void_script_api::export_script!(Spinner);
//! ```

pub mod ffi;
pub mod host;
pub mod property;
pub mod script;
pub mod transform;

pub use ffi::{
    CreateScriptFn, DestroyScriptFn, ScriptHandle, CREATE_SCRIPT_SYMBOL, DESTROY_SCRIPT_SYMBOL,
    SCRIPT_ABI_VERSION,
};
pub use host::{HostAccess, HostId, ScriptContext};
pub use property::{PropertyDescriptor, PropertyMut, PropertyType, PropertyValue};
pub use script::{Guarded, Script, ScriptFault, ScriptObject};
pub use transform::Transform;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::host::{HostId, ScriptContext};
    pub use crate::property::{PropertyDescriptor, PropertyMut, PropertyType};
    pub use crate::script::Script;
    pub use crate::transform::Transform;
}
