use crate::models::skin::MenuEntry;
use thiserror::Error;

/// Problems the user has to be told about. None of them stop the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    #[error("Unable to activate skin \"{config}\\{file}\": File not found.")]
    UnableToActivate { config: String, file: String },

    #[error("Unable to refresh skin \"{config}\\{file}\".")]
    UnableToRefresh { config: String, file: String },

    #[error("There are no available skins at:\n{skin_root}")]
    NoSkinsAvailable { skin_root: String },

    #[error("The settings file is not writable:\n{settings_file}")]
    SettingsNotWritable { settings_file: String },
}

/// Initial tab of the "about" surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AboutTab {
    Log,
    Measures,
    Plugins,
    Version,
}

impl AboutTab {
    /// Tab named at the start of the argument (case-insensitive).
    pub fn from_arg(arg: &str) -> Self {
        use crate::utils::starts_with_ignore_case as starts;
        match arg {
            a if starts(a, "Measures") => AboutTab::Measures,
            a if starts(a, "Plugins") => AboutTab::Plugins,
            a if starts(a, "Version") => AboutTab::Version,
            a => {
                if !a.is_empty() && !starts(a, "Log") {
                    tracing::debug!("!About: Unknown tab \"{}\", showing log", a);
                }
                AboutTab::Log
            }
        }
    }
}

/// Initial tab of the "manage" surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageTab {
    Skins,
    Themes,
    Settings,
}

impl ManageTab {
    pub fn from_arg(arg: &str) -> Self {
        use crate::utils::starts_with_ignore_case as starts;
        match arg {
            a if starts(a, "Themes") => ManageTab::Themes,
            a if starts(a, "Settings") => ManageTab::Settings,
            _ => ManageTab::Skins,
        }
    }
}

/// The UI side of the host: everything that needs a screen or the OS shell.
#[cfg_attr(test, mockall::automock)]
pub trait HostShell {
    fn show_notice(&mut self, notice: &UserNotice);

    /// Context menu of one running skin.
    fn show_skin_menu(&mut self, config: &str, entries: &[MenuEntry]);

    /// Global (tray) menu.
    fn show_tray_menu(&mut self, entries: &[MenuEntry]);

    fn open_about(&mut self, tab: AboutTab);

    fn open_manage(&mut self, tab: ManageTab);

    /// Run a non-bang command line.
    fn run_program(&mut self, command: &str);

    fn quit(&mut self);
}

/// Shell that only writes to the log. Used when running without a UI.
#[derive(Debug, Default)]
pub struct LoggingShell;

impl HostShell for LoggingShell {
    fn show_notice(&mut self, notice: &UserNotice) {
        tracing::warn!("{}", notice);
    }

    fn show_skin_menu(&mut self, config: &str, entries: &[MenuEntry]) {
        tracing::info!("Skin menu for {}: {} entries", config, entries.len());
    }

    fn show_tray_menu(&mut self, entries: &[MenuEntry]) {
        tracing::info!("Tray menu: {} entries", entries.len());
    }

    fn open_about(&mut self, tab: AboutTab) {
        tracing::info!("About requested ({:?})", tab);
    }

    fn open_manage(&mut self, tab: ManageTab) {
        tracing::info!("Manage requested ({:?})", tab);
    }

    fn run_program(&mut self, command: &str) {
        tracing::info!("Run requested: {}", command);
    }

    fn quit(&mut self) {
        tracing::info!("Quit requested");
    }
}
