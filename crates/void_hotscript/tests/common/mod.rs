//! Shared fixtures: an in-process compiler and loader that record what
//! happens, plus a handful of scripts with known behavior.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use void_hotscript::{
    HostWorld, LoadError, ModuleBacking, ModuleExports, ModuleLoader, ScriptCompiler,
    ScriptComponent, ScriptError, ScriptLayout, ScriptModule, ScriptServices,
};
use void_script_api::ffi::destroy_guarded;
use void_script_api::prelude::*;
use void_script_api::{HostId, ScriptHandle, SCRIPT_ABI_VERSION};

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

pub fn record(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

/// Drain everything recorded on this thread so far
pub fn take_events() -> Vec<String> {
    EVENTS.with(|events| events.borrow_mut().drain(..).collect())
}

// ---------------------------------------------------------------------------
// Source timestamps
// ---------------------------------------------------------------------------

pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

/// Move the modification time forward by `secs`
pub fn bump(path: &Path, secs: u64) -> SystemTime {
    let time = mtime(path) + Duration::from_secs(secs);
    set_mtime(path, time);
    time
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Writes a placeholder artifact instead of running a toolchain
#[derive(Default)]
pub struct StubCompiler {
    invocations: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    touch_source: AtomicBool,
}

impl StubCompiler {
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn fail(&self, script: &str) {
        self.failing.lock().insert(script.to_string());
    }

    pub fn succeed(&self, script: &str) {
        self.failing.lock().remove(script);
    }

    /// Simulate an edit landing while the build runs
    pub fn touch_source_during_build(&self, enabled: bool) {
        self.touch_source.store(enabled, Ordering::SeqCst);
    }
}

impl ScriptCompiler for StubCompiler {
    fn compile(&self, source: &Path, artifact: &Path) -> void_hotscript::Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let name = stem(source);
        record(format!("compile:{}", name));

        if self.failing.lock().contains(&name) {
            return Err(ScriptError::compile_failure(source, "error: expected one of `;` or `}`"));
        }

        fs::create_dir_all(artifact.parent().unwrap())?;
        fs::write(artifact, name.as_bytes())?;

        if self.touch_source.load(Ordering::SeqCst) {
            bump(source, 5);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves artifacts to in-process entry points by file stem
#[derive(Default)]
pub struct StubLoader {
    modules: Mutex<HashMap<String, ModuleExports>>,
}

impl StubLoader {
    pub fn register(&self, script: &str, exports: ModuleExports) {
        self.modules.lock().insert(script.to_string(), exports);
    }
}

struct StubBacking {
    name: String,
}

impl ModuleBacking for StubBacking {}

impl Drop for StubBacking {
    fn drop(&mut self) {
        record(format!("close:{}", self.name));
    }
}

impl ModuleLoader for StubLoader {
    fn load(&self, path: &Path) -> Result<Arc<ScriptModule>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::MissingArtifact(path.to_path_buf()));
        }
        let name = stem(path);
        let exports = self
            .modules
            .lock()
            .get(&name)
            .copied()
            .ok_or_else(|| LoadError::open_failure(path, "unknown stub module"))?;

        record(format!("open:{}", name));
        let backing = Box::new(StubBacking { name });
        Ok(Arc::new(unsafe { ScriptModule::new(path, exports, backing) }))
    }
}

fn stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Moves its host along +X at `Speed` units per second
pub struct Mover {
    speed: f32,
    label: String,
}

impl Default for Mover {
    fn default() -> Self {
        Self {
            speed: 10.0,
            label: "Ciao!".to_string(),
        }
    }
}

impl Script for Mover {
    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {
        record("on_create");
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) {
        if let Some(transform) = ctx.get_component::<Transform>() {
            transform.position[0] += self.speed * dt;
        }
    }

    fn on_destroy(&mut self) {
        record("on_destroy");
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        const PROPS: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("Speed", PropertyType::Float),
            PropertyDescriptor::new("Label", PropertyType::String),
        ];
        PROPS
    }

    fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
        match name {
            "Speed" => Some(PropertyMut::Float(&mut self.speed)),
            "Label" => Some(PropertyMut::String(&mut self.label)),
            _ => None,
        }
    }
}

/// Panics on its second update
#[derive(Default)]
pub struct Faulty {
    ticks: i32,
}

impl Script for Faulty {
    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>, _dt: f32) {
        self.ticks += 1;
        if self.ticks == 2 {
            panic!("index out of bounds");
        }
    }

    fn on_destroy(&mut self) {
        record("on_destroy");
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        &[]
    }

    fn property_mut(&mut self, _name: &str) -> Option<PropertyMut<'_>> {
        None
    }
}

/// Panics in `on_create`
#[derive(Default)]
pub struct Exploder;

impl Script for Exploder {
    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {
        panic!("cannot start");
    }

    fn on_destroy(&mut self) {
        record("on_destroy");
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        &[]
    }

    fn property_mut(&mut self, _name: &str) -> Option<PropertyMut<'_>> {
        None
    }
}

unsafe extern "C" fn create_mover() -> ScriptHandle {
    record("create");
    ScriptHandle::from_script(Mover::default())
}

unsafe extern "C" fn create_faulty() -> ScriptHandle {
    record("create");
    ScriptHandle::from_script(Faulty::default())
}

unsafe extern "C" fn create_exploder() -> ScriptHandle {
    record("create");
    ScriptHandle::from_script(Exploder)
}

unsafe extern "C" fn create_null() -> ScriptHandle {
    record("create");
    ScriptHandle::null()
}

unsafe extern "C" fn create_stale() -> ScriptHandle {
    record("create");
    let mut handle = ScriptHandle::from_script(Mover::default());
    handle.abi_version = SCRIPT_ABI_VERSION + 1;
    handle
}

unsafe extern "C" fn destroy_any(handle: ScriptHandle) {
    record("destroy");
    destroy_guarded(handle);
}

pub fn mover_exports() -> ModuleExports {
    ModuleExports { create: create_mover, destroy: destroy_any }
}

pub fn faulty_exports() -> ModuleExports {
    ModuleExports { create: create_faulty, destroy: destroy_any }
}

pub fn exploder_exports() -> ModuleExports {
    ModuleExports { create: create_exploder, destroy: destroy_any }
}

pub fn null_exports() -> ModuleExports {
    ModuleExports { create: create_null, destroy: destroy_any }
}

pub fn stale_exports() -> ModuleExports {
    ModuleExports { create: create_stale, destroy: destroy_any }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub dir: TempDir,
    pub compiler: Arc<StubCompiler>,
    pub loader: Arc<StubLoader>,
    pub world: HostWorld,
    pub host: HostId,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        let mut world = HostWorld::new();
        let host = world.spawn("Player");
        take_events();

        Self {
            dir,
            compiler: Arc::new(StubCompiler::default()),
            loader: Arc::new(StubLoader::default()),
            world,
            host,
        }
    }

    pub fn layout(&self) -> ScriptLayout {
        ScriptLayout::rooted(self.dir.path().join("scripts"))
    }

    pub fn services(&self) -> ScriptServices {
        ScriptServices::new(self.layout(), self.compiler.clone(), self.loader.clone())
    }

    pub fn component(&self) -> ScriptComponent {
        ScriptComponent::new(self.host, self.services())
    }

    /// Write a source file stamped with [`base_time`]
    pub fn write_source(&self, name: &str) -> PathBuf {
        let path = self.layout().source_path(name);
        fs::write(&path, format!("// {}\n", name)).unwrap();
        set_mtime(&path, base_time());
        path
    }

    /// Write a source and register its in-process entry points
    pub fn script(&self, name: &str, exports: ModuleExports) -> PathBuf {
        self.loader.register(name, exports);
        self.write_source(name)
    }

    pub fn position(&self) -> [f32; 3] {
        self.world.component::<Transform>(self.host).unwrap().position
    }
}

pub fn strings(events: &[&str]) -> Vec<String> {
    events.iter().map(|e| e.to_string()).collect()
}
