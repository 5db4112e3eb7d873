//! Fixed-rate tick loop over attached scripts

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use void_hotscript::{
    HostWorld, Notifications, ReloadStatus, ScriptComponent, ScriptConfig, ScriptServices,
};
use void_script_api::Transform;

#[cfg(feature = "hot-reload")]
use void_hotscript::ScriptWatcher;

/// Full mtime sweep interval when a watcher drives reloads
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// How often the status of every script is logged
const STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// A component plus the last error reported for it
struct Slot {
    component: ScriptComponent,
    last_error: Option<String>,
}

pub struct ScriptRunner {
    slots: Vec<Slot>,
    world: HostWorld,
    notifications: Notifications,
    tick: Duration,
    #[cfg(feature = "hot-reload")]
    watcher: Option<ScriptWatcher>,
}

/// Log a message and keep it visible for a while
fn notify(notifications: &mut Notifications, message: String) {
    log::info!(target: "notify", "{}", message);
    notifications.push(message);
}

impl ScriptRunner {
    /// Spawn the configured objects and bring up their scripts
    pub fn new(config: &ScriptConfig) -> Self {
        Self::with_services(config, ScriptServices::from_config(config))
    }

    pub fn with_services(config: &ScriptConfig, services: ScriptServices) -> Self {
        let mut world = HostWorld::new();
        let mut notifications = Notifications::default();
        let mut slots = Vec::with_capacity(config.scripts.len());

        for attachment in &config.scripts {
            let host = world.spawn(&attachment.object);
            let mut component = ScriptComponent::new(host, services.clone());
            let last_error = match component.load_script(&attachment.script, &mut world) {
                Ok(()) => {
                    notify(
                        &mut notifications,
                        format!("{} attached to {}", attachment.script, attachment.object),
                    );
                    None
                }
                Err(e) => {
                    notify(&mut notifications, e.to_string());
                    Some(e.to_string())
                }
            };
            component.take_diagnostic();
            slots.push(Slot { component, last_error });
        }

        #[cfg(feature = "hot-reload")]
        let watcher = if config.hot_reload.enabled {
            match ScriptWatcher::new(&config.layout, config.debounce()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    log::warn!("{}; falling back to per-tick checks", e);
                    None
                }
            }
        } else {
            None
        };

        if config.hot_reload.enabled && !void_hotscript::HOT_RELOAD {
            log::info!("Built without file watching; checking sources every tick");
        }

        Self {
            slots,
            world,
            notifications,
            tick: config.tick_interval(),
            #[cfg(feature = "hot-reload")]
            watcher,
        }
    }

    /// Tick until `running` clears or `frames` ticks have run
    pub fn run(&mut self, running: &AtomicBool, frames: Option<u64>) {
        let mut frame: u64 = 0;
        let mut last_sweep = Instant::now();
        let mut last_status = Instant::now();
        let dt = self.tick.as_secs_f32();

        log::info!("Running {} script(s), Ctrl+C to stop", self.slots.len());

        while running.load(Ordering::SeqCst) && frames.map_or(true, |max| frame < max) {
            let started = Instant::now();

            let sweep = started.duration_since(last_sweep) >= SWEEP_INTERVAL;
            if sweep {
                last_sweep = started;
            }
            self.check_reloads(sweep);
            self.update(dt);

            if started.duration_since(last_status) >= STATUS_INTERVAL {
                last_status = started;
                self.log_status(started);
            }

            frame += 1;
            if let Some(remaining) = self.tick.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    fn check_reloads(&mut self, sweep: bool) {
        #[cfg(feature = "hot-reload")]
        let changed = self.watcher.as_mut().map(|w| w.poll_changed_scripts());
        #[cfg(not(feature = "hot-reload"))]
        let changed: Option<Vec<String>> = None;

        self.reload_changed(changed.as_deref(), sweep);
    }

    /// Reload scripts whose sources changed.
    ///
    /// `changed` is what the watcher reported, `None` without a watcher. With
    /// a watcher only reported scripts are checked, plus a periodic sweep to
    /// catch edits whose events were debounced away.
    fn reload_changed(&mut self, changed: Option<&[String]>, sweep: bool) {
        for slot in &mut self.slots {
            let component = &mut slot.component;
            let should_check = match changed {
                Some(names) => {
                    sweep
                        || component
                            .script_name()
                            .map_or(false, |n| names.iter().any(|c| c == n))
                }
                None => true,
            };
            if !should_check {
                continue;
            }

            match component.reload_if_needed(&mut self.world) {
                Ok(ReloadStatus::Reloaded) => {
                    let name = component.script_name().unwrap_or_default();
                    notify(&mut self.notifications, format!("Reloaded {}", name));
                    slot.last_error = None;
                }
                Ok(ReloadStatus::Unchanged) => {}
                Err(e) => {
                    let message = e.to_string();
                    // A missing source fails every check; report it once
                    if slot.last_error.as_deref() != Some(message.as_str()) {
                        notify(&mut self.notifications, message.clone());
                        slot.last_error = Some(message);
                    }
                }
            }
            component.take_diagnostic();
        }
    }

    fn update(&mut self, dt: f32) {
        for slot in &mut self.slots {
            slot.component.update(&mut self.world, dt);
            if let Some(diagnostic) = slot.component.take_diagnostic() {
                notify(&mut self.notifications, diagnostic.clone());
                slot.last_error = Some(diagnostic);
            }
        }
    }

    fn log_status(&mut self, now: Instant) {
        for slot in &mut self.slots {
            let component = &mut slot.component;
            let host = component.host();
            let object = self
                .world
                .get(host)
                .map(|o| o.name().to_string())
                .unwrap_or_default();
            let position = self
                .world
                .component::<Transform>(host)
                .map(|t| t.position)
                .unwrap_or_default();

            let properties: Vec<String> = component
                .properties()
                .into_iter()
                .filter_map(|info| {
                    let value = component.property_value(&info.name)?;
                    Some(format!("{}={}", info.name, value))
                })
                .collect();

            log::info!(
                "{} [{}] {:?} pos=({:.2}, {:.2}, {:.2}) {}",
                object,
                component.script_name().unwrap_or("-"),
                component.state(),
                position[0],
                position[1],
                position[2],
                properties.join(" ")
            );
        }

        for notification in self.notifications.active(now) {
            log::debug!(
                target: "notify",
                "{} ({:.1}s left)",
                notification.message,
                notification.remaining(now).as_secs_f32()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::SystemTime;
    use void_hotscript::{
        LoadError, ModuleBacking, ModuleExports, ModuleLoader, ScriptAttachment, ScriptCompiler,
        ScriptLayout, ScriptModule,
    };
    use void_script_api::ffi::{create_guarded, destroy_guarded};
    use void_script_api::prelude::*;
    use void_script_api::ScriptHandle;

    #[derive(Default)]
    struct Idle;

    impl Script for Idle {
        fn properties(&self) -> &'static [PropertyDescriptor] {
            &[]
        }

        fn property_mut(&mut self, _name: &str) -> Option<PropertyMut<'_>> {
            None
        }
    }

    unsafe extern "C" fn create_idle() -> ScriptHandle {
        create_guarded::<Idle>()
    }

    unsafe extern "C" fn destroy_idle(handle: ScriptHandle) {
        destroy_guarded(handle)
    }

    /// Counts builds and writes a placeholder artifact
    #[derive(Default)]
    struct CountingCompiler {
        builds: AtomicUsize,
    }

    impl ScriptCompiler for CountingCompiler {
        fn compile(&self, _source: &Path, artifact: &Path) -> void_hotscript::Result<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if let Some(dir) = artifact.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(artifact, b"idle")?;
            Ok(())
        }
    }

    struct NoBacking;

    impl ModuleBacking for NoBacking {}

    /// Hands out the in-process `Idle` entry points for any artifact
    struct InProcessLoader;

    impl ModuleLoader for InProcessLoader {
        fn load(&self, path: &Path) -> Result<Arc<ScriptModule>, LoadError> {
            let exports = ModuleExports {
                create: create_idle,
                destroy: destroy_idle,
            };
            Ok(Arc::new(unsafe { ScriptModule::new(path, exports, Box::new(NoBacking)) }))
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        source: std::path::PathBuf,
        compiler: Arc<CountingCompiler>,
        runner: ScriptRunner,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let layout = ScriptLayout::rooted(dir.path().join("scripts"));
            fs::create_dir_all(&layout.scripts_dir).unwrap();
            let source = layout.source_path("Idle");
            fs::write(&source, "// Idle\n").unwrap();
            set_mtime(&source, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));

            let mut config = ScriptConfig::default();
            config.layout = layout.clone();
            config.hot_reload.enabled = false;
            config.scripts = vec![ScriptAttachment {
                object: "Player".to_string(),
                script: "Idle".to_string(),
            }];

            let compiler = Arc::new(CountingCompiler::default());
            let services = ScriptServices::new(layout, compiler.clone(), Arc::new(InProcessLoader));
            let runner = ScriptRunner::with_services(&config, services);

            Self {
                _dir: dir,
                source,
                compiler,
                runner,
            }
        }

        fn builds(&self) -> usize {
            self.compiler.builds.load(Ordering::SeqCst)
        }

        fn touch(&self) {
            let modified = fs::metadata(&self.source).unwrap().modified().unwrap();
            set_mtime(&self.source, modified + Duration::from_secs(5));
        }
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_hot_reload_feature_forwarded() {
        assert_eq!(void_hotscript::HOT_RELOAD, cfg!(feature = "hot-reload"));
    }

    #[test]
    fn test_attach_on_startup() {
        let harness = Harness::new();
        assert_eq!(harness.builds(), 1);
        assert!(harness.runner.slots[0].component.is_active());
        assert!(harness.runner.slots[0].last_error.is_none());
        assert_eq!(harness.runner.notifications.len(), 1);
    }

    #[test]
    fn test_watcher_selects_reported_scripts() {
        let mut harness = Harness::new();
        harness.touch();

        harness.runner.reload_changed(Some(names(&[]).as_slice()), false);
        harness.runner.reload_changed(Some(names(&["Other"]).as_slice()), false);
        assert_eq!(harness.builds(), 1);

        harness.runner.reload_changed(Some(names(&["Idle"]).as_slice()), false);
        assert_eq!(harness.builds(), 2);
        assert_eq!(harness.runner.notifications.len(), 2);
        assert!(harness.runner.slots[0].component.is_active());
    }

    #[test]
    fn test_sweep_checks_unreported_scripts() {
        let mut harness = Harness::new();
        harness.touch();

        harness.runner.reload_changed(Some(names(&[]).as_slice()), true);
        assert_eq!(harness.builds(), 2);

        // Unchanged source: the sweep does not rebuild
        harness.runner.reload_changed(Some(names(&[]).as_slice()), true);
        assert_eq!(harness.builds(), 2);
    }

    #[test]
    fn test_without_watcher_checks_every_tick() {
        let mut harness = Harness::new();
        harness.touch();

        harness.runner.reload_changed(None, false);
        assert_eq!(harness.builds(), 2);
    }

    #[test]
    fn test_repeated_error_reported_once() {
        let mut harness = Harness::new();
        fs::remove_file(&harness.source).unwrap();
        let before = harness.runner.notifications.len();

        for _ in 0..3 {
            harness.runner.reload_changed(None, false);
        }

        assert_eq!(harness.runner.notifications.len(), before + 1);
        let error = harness.runner.slots[0].last_error.as_deref().unwrap();
        assert!(error.contains("does not exist"), "unexpected error: {}", error);
        // Missing source leaves the running instance alone
        assert!(harness.runner.slots[0].component.is_active());
        assert_eq!(harness.builds(), 1);
    }
}
