//! Shared fixtures for the integration tests: an on-disk program folder with a
//! settings file and a skin tree, a shell that records what it was asked to
//! do, and a factory whose instances can be told to fail on refresh.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use skinhost::host::{AboutTab, Host, HostShell, ManageTab, UserNotice};
use skinhost::instance::headless::Journal;
use skinhost::instance::{
    HeadlessFactory, InstanceAction, InstanceError, InstanceFactory, SkinInstance,
};
use skinhost::models::{HostOptions, MenuEntry};
use skinhost::HostPaths;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Everything the shell was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Notice(UserNotice),
    SkinMenu(String, usize),
    TrayMenu(usize),
    About(AboutTab),
    Manage(ManageTab),
    Run(String),
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct ShellLog(Arc<Mutex<Vec<ShellCall>>>);

impl ShellLog {
    pub fn calls(&self) -> Vec<ShellCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<UserNotice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ShellCall::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: ShellCall) {
        self.0.lock().unwrap().push(call);
    }
}

pub struct RecordingShell(pub ShellLog);

impl HostShell for RecordingShell {
    fn show_notice(&mut self, notice: &UserNotice) {
        self.0.push(ShellCall::Notice(notice.clone()));
    }

    fn show_skin_menu(&mut self, config: &str, entries: &[MenuEntry]) {
        self.0.push(ShellCall::SkinMenu(config.to_string(), entries.len()));
    }

    fn show_tray_menu(&mut self, entries: &[MenuEntry]) {
        self.0.push(ShellCall::TrayMenu(entries.len()));
    }

    fn open_about(&mut self, tab: AboutTab) {
        self.0.push(ShellCall::About(tab));
    }

    fn open_manage(&mut self, tab: ManageTab) {
        self.0.push(ShellCall::Manage(tab));
    }

    fn run_program(&mut self, command: &str) {
        self.0.push(ShellCall::Run(command.to_string()));
    }

    fn quit(&mut self) {
        self.0.push(ShellCall::Quit);
    }
}

/// Headless instances, except that configs listed in `failing` refuse to
/// refresh.
pub struct FlakyFactory {
    inner: HeadlessFactory,
    failing: Arc<Mutex<Vec<String>>>,
}

impl FlakyFactory {
    pub fn new(failing: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            inner: HeadlessFactory::new(),
            failing,
        }
    }

    pub fn journal(&self) -> Journal {
        self.inner.journal()
    }
}

impl InstanceFactory for FlakyFactory {
    fn create(
        &mut self,
        skin_root: &Utf8Path,
        config: &str,
        variant: &str,
    ) -> Result<Box<dyn SkinInstance>, InstanceError> {
        let inner = self.inner.create(skin_root, config, variant)?;
        Ok(Box::new(FlakySkin {
            inner,
            failing: self.failing.clone(),
        }))
    }
}

struct FlakySkin {
    inner: Box<dyn SkinInstance>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl SkinInstance for FlakySkin {
    fn config_name(&self) -> &str {
        self.inner.config_name()
    }

    fn variant_file(&self) -> &str {
        self.inner.variant_file()
    }

    fn file_path(&self) -> &Utf8Path {
        self.inner.file_path()
    }

    fn run_bang(&mut self, action: InstanceAction, args: &str) {
        self.inner.run_bang(action, args);
    }

    fn refresh(&mut self) -> Result<(), InstanceError> {
        let config = self.inner.config_name().to_string();
        if self.failing.lock().unwrap().contains(&config) {
            return Err(InstanceError::Failed {
                config,
                message: "refresh refused".to_string(),
            });
        }
        self.inner.refresh()
    }

    fn belongs_to_group(&self, group: &str) -> bool {
        self.inner.belongs_to_group(group)
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.inner.variable(name)
    }

    fn producer_value(&self, name: &str) -> Option<String> {
        self.inner.producer_value(name)
    }

    fn evaluate_formula(&self, expr: &str) -> Option<f64> {
        self.inner.evaluate_formula(expr)
    }

    fn window_handle(&self) -> u64 {
        self.inner.window_handle()
    }
}

/// A program folder holding `Rainmeter.ini` and a `Skins` tree.
pub struct Fixture {
    _temp: TempDir,
    pub program_dir: Utf8PathBuf,
    pub skin_root: Utf8PathBuf,
    pub settings_file: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let program_dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let skin_root = program_dir.join("Skins");
        fs::create_dir_all(&skin_root).unwrap();
        let settings_file = program_dir.join("Rainmeter.ini");
        fs::write(&settings_file, "[Rainmeter]\n").unwrap();

        Self {
            _temp: temp,
            program_dir,
            skin_root,
            settings_file,
        }
    }

    /// Folder of a config (`Suite\Clock` → `Skins/Suite/Clock`).
    pub fn config_dir(&self, config: &str) -> Utf8PathBuf {
        skinhost::utils::config_dir(&self.skin_root, config)
    }

    /// Write a variant file, creating its folders.
    pub fn add_skin(&self, config: &str, variant: &str, body: &str) -> Utf8PathBuf {
        let dir = self.config_dir(config);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(variant);
        fs::write(&path, body).unwrap();
        path
    }

    /// A variant that joins `groups` and defines `variables`.
    pub fn add_grouped_skin(
        &self,
        config: &str,
        variant: &str,
        groups: &str,
        variables: &[(&str, &str)],
    ) -> Utf8PathBuf {
        let mut body = format!("[Rainmeter]\nGroup={groups}\n\n[Variables]\n");
        for (name, value) in variables {
            body.push_str(&format!("{name}={value}\n"));
        }
        self.add_skin(config, variant, &body)
    }

    pub fn write_settings(&self, text: &str) {
        fs::write(&self.settings_file, text).unwrap();
    }

    pub fn read_settings(&self) -> String {
        fs::read_to_string(&self.settings_file).unwrap()
    }

    pub fn paths(&self) -> HostPaths {
        HostPaths::resolve_with_default(&self.program_dir, Some(self.settings_file.as_str()), None)
            .unwrap()
    }

    /// Initialized host over headless instances.
    pub fn host(&self) -> (Host, Journal, ShellLog) {
        let factory = HeadlessFactory::new();
        let journal = factory.journal();
        self.host_with(Box::new(factory), journal)
    }

    /// Initialized host whose instances fail to refresh when listed in
    /// `failing`.
    pub fn flaky_host(&self, failing: Arc<Mutex<Vec<String>>>) -> (Host, Journal, ShellLog) {
        let factory = FlakyFactory::new(failing);
        let journal = factory.journal();
        self.host_with(Box::new(factory), journal)
    }

    fn host_with(
        &self,
        factory: Box<dyn InstanceFactory>,
        journal: Journal,
    ) -> (Host, Journal, ShellLog) {
        let shell = ShellLog::default();
        let mut host = Host::new(
            self.paths(),
            HostOptions::default(),
            factory,
            Box::new(RecordingShell(shell.clone())),
        );
        host.initialize();
        (host, journal, shell)
    }
}

/// `Key=Value` lines of one section of an INI text.
pub fn section_value(text: &str, section: &str, key: &str) -> Option<String> {
    skinhost::services::IniDocument::parse(text)
        .get(section, key)
        .map(str::to_string)
}
