//! # void_hotscript - Live Native Script Hot-Reload
//!
//! Attach scripts written in Rust to host objects, compile them into dynamic
//! libraries on the fly and swap in new code whenever the source changes,
//! without restarting the host.
//!
//! ## Overview
//!
//! Each script lives in `scripts/<Name>.rs` and is built into
//! `scripts/compiled/<Name>.<dll|so|dylib>`. The contract a script must
//! implement lives in [`void_script_api`]; this crate is the host side.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Script Source  │────▶│ScriptCompiler   │
//! │ (Player.rs)     │     │ (rustc cdylib)  │
//! └─────────────────┘     └────────┬────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │  ScriptModule   │◀────│  ModuleLoader   │
//! │ (Arc, 2 exports)│     │  (libloading)   │
//! └────────┬────────┘     └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ ScriptInstance  │────▶│ ScriptComponent │ ◀── one per host object
//! │ (dyn object)    │     │ (reload, tick)  │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use void_hotscript::prelude::*;
//!
//! let config = ScriptConfig::load();
//! let services = ScriptServices::from_config(&config);
//!
//! let mut world = HostWorld::new();
//! let player = world.spawn("Player");
//!
//! let mut script = ScriptComponent::new(player, services);
//! script.load_script("PlayerController", &mut world)?;
//!
//! loop {
//!     script.reload_if_needed(&mut world)?;
//!     script.update(&mut world, 1.0 / 60.0);
//! }
//! ```

mod compiler;
mod component;
mod config;
mod descriptor;
mod error;
mod host;
mod instance;
mod loader;
mod notifications;

#[cfg(feature = "hot-reload")]
mod watcher;

pub use compiler::{partial_path, CompilerConfig, ScriptCompiler, ToolchainCompiler};
pub use component::{ReloadStatus, ScriptComponent, ScriptServices};
pub use config::{HotReloadConfig, ScriptAttachment, ScriptConfig, CONFIG_SEARCH_PATHS};
pub use descriptor::{crate_name, ScriptDescriptor, ScriptLayout};
pub use error::{ConfigError, LoadError, Result, ScriptError};
pub use host::{HostObject, HostWorld};
pub use instance::{catch_panic, HostBinding, PropertyInfo, ScriptInstance, ScriptState};
pub use loader::{
    unload, DylibLoader, LoaderConfig, ModuleBacking, ModuleExports, ModuleLoader, ScriptModule,
};
pub use notifications::{Notification, Notifications};

#[cfg(feature = "hot-reload")]
pub use watcher::{ScriptFileEvent, ScriptWatcher, WatchError};

pub use void_script_api;

/// Whether this build carries the file watcher
pub const HOT_RELOAD: bool = cfg!(feature = "hot-reload");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::component::{ReloadStatus, ScriptComponent, ScriptServices};
    pub use crate::config::ScriptConfig;
    pub use crate::error::{Result, ScriptError};
    pub use crate::host::HostWorld;
    pub use crate::instance::ScriptState;

    #[cfg(feature = "hot-reload")]
    pub use crate::watcher::ScriptWatcher;
}
