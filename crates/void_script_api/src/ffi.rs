//! FFI types and entry points shared by the host and compiled scripts
//!
//! All types here use `#[repr(C)]`. The two exported functions are the entire
//! dynamic-linking protocol; the trait object behind [`ScriptHandle`] carries
//! everything else.

use crate::script::{Guarded, Script, ScriptObject};
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// Contract version stamped into every handle a module creates
pub const SCRIPT_ABI_VERSION: u32 = 1;

/// Factory symbol (null-terminated for `libloading`)
pub const CREATE_SCRIPT_SYMBOL: &[u8] = b"void_create_script\0";

/// Destroyer symbol (null-terminated for `libloading`)
pub const DESTROY_SCRIPT_SYMBOL: &[u8] = b"void_destroy_script\0";

/// Zero-argument factory returning an owning handle
pub type CreateScriptFn = unsafe extern "C" fn() -> ScriptHandle;

/// Destroyer reclaiming a handle produced by the same module's factory
pub type DestroyScriptFn = unsafe extern "C" fn(ScriptHandle);

/// Owning, type-erased pointer to a script object living in a module.
///
/// The object is a `Box<Box<dyn ScriptObject>>` flattened to a thin pointer so
/// that the handle itself has a plain C layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ScriptHandle {
    /// Contract version the module was built against
    pub abi_version: u32,
    /// Pointer to the boxed trait object, or null
    pub object: *mut c_void,
}

impl ScriptHandle {
    /// A null handle stamped with the current ABI version
    pub const fn null() -> Self {
        Self {
            abi_version: SCRIPT_ABI_VERSION,
            object: ptr::null_mut(),
        }
    }

    /// Check if handle is null
    pub fn is_null(&self) -> bool {
        self.object.is_null()
    }

    /// Check the contract stamp against this build
    pub fn abi_matches(&self) -> bool {
        self.abi_version == SCRIPT_ABI_VERSION
    }

    /// Take ownership of a boundary object
    pub fn new(object: Box<dyn ScriptObject>) -> Self {
        let outer: Box<Box<dyn ScriptObject>> = Box::new(object);
        Self {
            abi_version: SCRIPT_ABI_VERSION,
            object: Box::into_raw(outer).cast(),
        }
    }

    /// Wrap a user script in [`Guarded`] and take ownership of it
    pub fn from_script<T: Script + 'static>(script: T) -> Self {
        Self::new(Box::new(Guarded::new(script)))
    }

    /// Borrow the object behind the handle.
    ///
    /// # Safety
    /// The handle must have been produced by [`ScriptHandle::new`] in a module
    /// that is still loaded, must not have been destroyed, and the caller picks
    /// a lifetime that does not outlive either.
    pub unsafe fn object_mut<'a>(&self) -> Option<&'a mut dyn ScriptObject> {
        let outer = self.object.cast::<Box<dyn ScriptObject>>();
        outer.as_mut().map(|inner| &mut **inner)
    }

    /// Reclaim the boxed object.
    ///
    /// # Safety
    /// Must only be called once, by the module that created the handle.
    pub unsafe fn into_object(self) -> Option<Box<dyn ScriptObject>> {
        if self.is_null() {
            return None;
        }
        let outer = Box::from_raw(self.object.cast::<Box<dyn ScriptObject>>());
        Some(*outer)
    }
}

/// Construct `T` and hand it out as a guarded handle.
///
/// Called by the factory that [`export_script!`](crate::export_script)
/// generates. A panicking constructor yields a null handle.
pub fn create_guarded<T: Script + Default + 'static>() -> ScriptHandle {
    match panic::catch_unwind(T::default) {
        Ok(script) => ScriptHandle::from_script(script),
        Err(_) => ScriptHandle::null(),
    }
}

/// Drop the object behind `handle` inside the module that created it.
///
/// # Safety
/// `handle` must come from this module's factory and not be reused afterwards.
pub unsafe fn destroy_guarded(handle: ScriptHandle) {
    if let Some(object) = handle.into_object() {
        let _ = panic::catch_unwind(AssertUnwindSafe(move || drop(object)));
    }
}

/// Export a [`Script`] type as the module's factory/destroyer pair.
///
/// The type must implement `Default`; its default value is the instance the
/// host sees right after construction.
#[macro_export]
macro_rules! export_script {
    ($script:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn void_create_script() -> $crate::ffi::ScriptHandle {
            $crate::ffi::create_guarded::<$script>()
        }

        #[no_mangle]
        pub unsafe extern "C" fn void_destroy_script(handle: $crate::ffi::ScriptHandle) {
            $crate::ffi::destroy_guarded(handle)
        }
    };
}
