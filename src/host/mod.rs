//! The host application context.
//!
//! [`Host`] owns everything the bang handlers touch: the config registry, the
//! settings store, the running instances and the deferred-task queue. Every
//! entry point takes `&mut Host`, so there is exactly one thread of control
//! and no global state.
//!
//! # Re-entrancy
//!
//! Commands issued by an instance run with that instance's id on the host's
//! call stack. An instance on the call stack is never destroyed: deactivating
//! it marks it pending and adds it to the pending-teardown set. It keeps its
//! running-map entry (and so its substitution context) until [`Host::pump`]
//! removes it from both once the stack is empty. A new instance of the same
//! config takes over the map entry right away.

pub mod activation;
pub mod bridge;
pub mod dispatch;
pub mod menu;
pub mod shell;

pub use activation::{ActivationOutcome, DeactivationOutcome, Divergence, RefreshReport};
pub use bridge::BridgeReply;
pub use dispatch::{Bang, BangTable, DispatchError};
pub use shell::{AboutTab, HostShell, LoggingShell, ManageTab, UserNotice};

use crate::config::{self, HostPaths};
use crate::instance::{InstanceFactory, InstanceId, SkinInstance};
use crate::metrics::Metrics;
use crate::models::options::{GLOBAL_SECTION, HostOptions};
use crate::services::interpolate::VariableInterpolator;
use crate::services::scanner::{ConfigScanner, DirectoryLister, FsLister};
use crate::services::settings::{IniMappingProvider, NoIniMappings, SettingsStore};
use crate::services::stats::StatsStore;
use crate::services::themes::ThemeStore;
use crate::state::{ConfigRegistry, EventBus, HostEvent};
use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};

/// A created instance and what it was created from.
pub struct RunningSkin {
    pub id: InstanceId,
    pub config: String,
    pub variant: String,
    pub instance: Box<dyn SkinInstance>,
    /// Deactivated while on the call stack; destroyed at the next safe point
    pub(crate) pending: bool,
}

impl RunningSkin {
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Where a deactivated instance waits for the safe point.
pub(crate) enum Parked {
    /// Still in the running map under its config key
    InPlace,
    /// Pushed out of the running map by a newer instance of the same config
    Detached(RunningSkin),
}

/// Work that has to wait until no instance is on the call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    RefreshAll,
    Quit,
    LoadTheme(String),
    Bang(String),
}

/// Running-map key for a config name.
fn running_key(name: &str) -> String {
    name.to_lowercase()
}

pub struct Host {
    pub(crate) paths: HostPaths,
    pub(crate) options: HostOptions,
    pub(crate) settings: SettingsStore,
    pub(crate) registry: ConfigRegistry,
    pub(crate) themes: ThemeStore,
    pub(crate) stats: StatsStore,
    scanner: ConfigScanner<Box<dyn DirectoryLister>>,

    /// Live instances keyed by lowercased config name
    pub(crate) running: BTreeMap<String, RunningSkin>,
    /// Deactivated instances still waiting to be destroyed
    pub(crate) pending_teardown: IndexMap<InstanceId, Parked>,
    pub(crate) deferred: VecDeque<DeferredTask>,
    pub(crate) call_stack: Vec<InstanceId>,
    next_instance_id: InstanceId,

    pub(crate) factory: Box<dyn InstanceFactory>,
    pub(crate) shell: Box<dyn HostShell>,
    pub(crate) interpolator: VariableInterpolator,
    pub(crate) bangs: BangTable,
    events: EventBus,
    metrics: Metrics,
    quit_requested: bool,
}

impl Host {
    pub fn new(
        paths: HostPaths,
        options: HostOptions,
        factory: Box<dyn InstanceFactory>,
        shell: Box<dyn HostShell>,
    ) -> Self {
        let settings = SettingsStore::new(
            paths.settings_file.clone(),
            paths.skin_root.clone(),
            Box::new(NoIniMappings),
        );

        Self {
            themes: ThemeStore::new(&paths.settings_dir),
            stats: StatsStore::new(paths.stats_file.clone()),
            scanner: ConfigScanner::new(Box::new(FsLister)),
            registry: ConfigRegistry::new(),
            running: BTreeMap::new(),
            pending_teardown: IndexMap::new(),
            deferred: VecDeque::new(),
            call_stack: Vec::new(),
            next_instance_id: 1,
            interpolator: VariableInterpolator::new(),
            bangs: BangTable::new(),
            events: EventBus::new(),
            metrics: Metrics::new(),
            quit_requested: false,
            paths,
            options,
            settings,
            factory,
            shell,
        }
    }

    /// Use another directory lister for skin scans.
    pub fn with_lister(mut self, lister: Box<dyn DirectoryLister>) -> Self {
        self.scanner = ConfigScanner::new(lister);
        self
    }

    /// Use another source of OS-mapped INI files for guarded writes.
    pub fn with_ini_mappings(mut self, mappings: Box<dyn IniMappingProvider>) -> Self {
        self.settings = SettingsStore::new(
            self.paths.settings_file.clone(),
            self.paths.skin_root.clone(),
            mappings,
        );
        self
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn themes(&self) -> &ThemeStore {
        &self.themes
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Startup sequence: settings check, scans, general settings, statistics,
    /// then every config marked active.
    pub fn initialize(&mut self) {
        if !self.settings.test_writable() {
            let notice = UserNotice::SettingsNotWritable {
                settings_file: self.paths.settings_file.to_string(),
            };
            self.shell.show_notice(&notice);
        }

        self.reload_settings(true);

        if self.registry.is_empty() {
            let notice = UserNotice::NoSkinsAvailable {
                skin_root: self.paths.skin_root.to_string(),
            };
            self.shell.show_notice(&notice);
        }

        match self.stats.migrate(&mut self.settings) {
            Ok(_) => {
                if let Err(e) = self.stats.read() {
                    tracing::warn!("Failed to read statistics: {:#}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to migrate statistics: {:#}", e),
        }

        self.activate_active_configs();
    }

    /// Rescan skins and themes and re-read the general settings.
    ///
    /// `read_active` takes each config's `Active` value from the settings file;
    /// otherwise selections are rebuilt from the running instances.
    pub(crate) fn reload_settings(&mut self, read_active: bool) {
        self.settings.reload();

        match config::load_options(&self.paths.settings_file) {
            Ok(options) => self.options = options,
            Err(e) => tracing::warn!("Keeping previous options: {:#}", e),
        }

        match self.paths.resolve_skin_root(&self.options.skin_path) {
            Ok(true) => {
                let skin_path = self.paths.skin_path_setting();
                if let Err(e) = self.settings.write(GLOBAL_SECTION, "SkinPath", &skin_path) {
                    tracing::warn!("Failed to store SkinPath: {:#}", e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to resolve skin folder: {:#}", e),
        }
        self.settings.set_skin_root(self.paths.skin_root.clone());

        let scan = self.scanner.scan(&self.paths.skin_root);
        self.registry.replace(scan);
        self.themes.scan();
        self.events.publish(HostEvent::SkinsScanned {
            configs: self.registry.len(),
        });

        for index in 0..self.registry.len() {
            let Some(name) = self.registry.config(index).map(|c| c.name.clone()) else {
                continue;
            };

            let order = self.settings.read_int(&name, "LoadOrder", 0);
            self.registry.set_load_order(index, order);

            let active = if read_active {
                self.settings.read_int(&name, "Active", 0)
            } else {
                0
            };
            if let (Ok(active), Some(config)) =
                (usize::try_from(active), self.registry.config_mut(index))
            {
                config.set_active(active);
            }
        }

        tracing::info!(
            "Found {} skins and {} themes in {}",
            self.registry.len(),
            self.themes.themes().len(),
            self.paths.skin_root
        );
    }

    /// Running instance of a config, matched case-insensitively.
    pub fn running(&self, name: &str) -> Option<&RunningSkin> {
        self.running.get(&running_key(name))
    }

    pub fn running_mut(&mut self, name: &str) -> Option<&mut RunningSkin> {
        self.running.get_mut(&running_key(name))
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running(name).is_some()
    }

    /// Names of the running configs, in running-map order.
    pub fn running_names(&self) -> Vec<String> {
        self.running.values().map(|s| s.config.clone()).collect()
    }

    pub fn pending_teardown_len(&self) -> usize {
        self.pending_teardown.len()
    }

    /// Running instances sorted by load order, ties by scan position. Configs
    /// that vanished from the registry sort first with order 0.
    pub(crate) fn running_by_load_order(&self) -> Vec<String> {
        let mut keys: Vec<(i64, usize, String)> = self
            .running
            .iter()
            .map(|(key, skin)| match self.registry.find(&skin.config) {
                Some(index) => (self.registry.load_order_of(index), index, key.clone()),
                None => (0, 0, key.clone()),
            })
            .collect();
        keys.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        keys.into_iter().map(|(_, _, key)| key).collect()
    }

    /// Instance by id, including one displaced while waiting for teardown.
    pub(crate) fn find_running_by_id(&self, id: InstanceId) -> Option<&RunningSkin> {
        self.running.values().find(|skin| skin.id == id).or_else(|| {
            self.pending_teardown.values().find_map(|parked| match parked {
                Parked::Detached(skin) if skin.id == id => Some(skin),
                _ => None,
            })
        })
    }

    /// Move a pending instance of `name` out of the running map so a new
    /// instance can take its key.
    pub(crate) fn detach_pending(&mut self, name: &str) {
        let key = running_key(name);
        if !self.running.get(&key).is_some_and(|skin| skin.pending) {
            return;
        }
        if let Some(skin) = self.running.remove(&key) {
            self.pending_teardown.insert(skin.id, Parked::Detached(skin));
        }
    }

    pub(crate) fn allocate_instance_id(&mut self) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        id
    }

    /// Queue an externally posted command for the next [`pump`](Self::pump).
    pub fn post_bang(&mut self, text: impl Into<String>) {
        self.deferred.push_back(DeferredTask::Bang(text.into()));
    }

    /// The safe point. Runs queued tasks and destroys pending instances until
    /// both queues are empty. Does nothing while an instance is on the call
    /// stack.
    ///
    /// # Returns
    /// Number of queued tasks that ran
    pub fn pump(&mut self) -> usize {
        if !self.call_stack.is_empty() {
            tracing::debug!("Not a safe point, {} calls in progress", self.call_stack.len());
            return 0;
        }

        let mut ran = 0;
        loop {
            self.drain_pending_teardown();
            let Some(task) = self.deferred.pop_front() else {
                break;
            };
            self.run_task(task);
            ran += 1;
        }
        ran
    }

    fn run_task(&mut self, task: DeferredTask) {
        tracing::debug!("Running deferred task: {:?}", task);
        match task {
            DeferredTask::RefreshAll => {
                self.refresh_all();
            }
            DeferredTask::Quit => {
                self.destroy_all();
                self.quit_requested = true;
                self.events.publish(HostEvent::QuitRequested);
                self.shell.quit();
            }
            DeferredTask::LoadTheme(name) => {
                if let Err(e) = self.load_theme(&name) {
                    tracing::error!("Failed to load theme {}: {:#}", name, e);
                }
            }
            DeferredTask::Bang(text) => {
                if let Err(e) = self.execute_command(&text, None) {
                    tracing::error!("{}", e);
                }
            }
        }
    }

    /// Destroy every pending instance, oldest first. An instance leaves the
    /// running map and the pending set in the same step.
    fn drain_pending_teardown(&mut self) -> usize {
        let mut destroyed = 0;
        while let Some((id, parked)) = self.pending_teardown.shift_remove_index(0) {
            let skin = match parked {
                Parked::Detached(skin) => Some(skin),
                Parked::InPlace => self
                    .running
                    .iter()
                    .find(|(_, skin)| skin.id == id)
                    .map(|(key, _)| key.clone())
                    .and_then(|key| self.running.remove(&key)),
            };
            if let Some(skin) = skin {
                self.destroy(skin);
                destroyed += 1;
            }
        }
        destroyed
    }

    pub(crate) fn destroy(&mut self, skin: RunningSkin) {
        tracing::debug!("Destroying skin: {}\\{}", skin.config, skin.variant);
        let config = skin.config.clone();
        drop(skin);
        self.metrics.record_deactivation();
        self.events.publish(HostEvent::SkinDestroyed { config });
    }

    /// Destroy every instance, running or pending, without touching the
    /// settings file.
    pub(crate) fn destroy_all(&mut self) {
        let running = std::mem::take(&mut self.running);
        for (_, skin) in running {
            self.destroy(skin);
        }
        self.drain_pending_teardown();
        for config in self.registry.configs_mut() {
            config.active = 0;
        }
    }

    /// Replace the settings file with a theme and start over with its skins.
    /// Deferred while an instance is on the call stack.
    pub fn load_theme(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.call_stack.is_empty() {
            self.deferred.push_back(DeferredTask::LoadTheme(name.to_string()));
            return Ok(());
        }

        self.destroy_all();
        self.themes.apply(name, &self.paths.settings_file)?;
        self.reload_settings(true);
        self.activate_active_configs();
        self.events.publish(HostEvent::ThemeLoaded {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Clear the statistics counters and stamp a new start date.
    pub fn reset_stats(&mut self) -> anyhow::Result<()> {
        self.stats.reset()
    }

    /// Tear everything down at exit.
    pub fn shutdown(&mut self) {
        self.destroy_all();
        self.metrics.log_summary();
    }
}
