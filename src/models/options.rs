use serde::{Deserialize, Serialize};

/// Name of the global section in the settings file.
pub const GLOBAL_SECTION: &str = "Rainmeter";

/// Global host options read from the `[Rainmeter]` section.
///
/// Values in the settings file are strings; numeric flags accept `0`/`1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOptions {
    #[serde(rename = "logging", default)]
    pub logging: bool,

    #[serde(rename = "debug", default)]
    pub debug: bool,

    #[serde(rename = "skinpath", default)]
    pub skin_path: String,

    #[serde(rename = "configeditor", default = "default_config_editor")]
    pub config_editor: String,

    #[serde(rename = "logviewer", default = "default_log_viewer")]
    pub log_viewer: String,

    #[serde(rename = "disabledragging", default)]
    pub disable_dragging: bool,

    #[serde(rename = "disableversioncheck", default)]
    pub disable_version_check: bool,

    #[serde(rename = "language", default)]
    pub language: String,

    #[serde(rename = "trayexecutel", default)]
    pub tray_execute_l: String,

    #[serde(rename = "trayexecuter", default)]
    pub tray_execute_r: String,

    #[serde(rename = "trayexecutem", default)]
    pub tray_execute_m: String,

    #[serde(rename = "trayexecutedl", default)]
    pub tray_execute_dl: String,

    #[serde(rename = "trayexecutedr", default)]
    pub tray_execute_dr: String,

    #[serde(rename = "trayexecutedm", default)]
    pub tray_execute_dm: String,
}

fn default_config_editor() -> String {
    "Notepad".to_string()
}

fn default_log_viewer() -> String {
    "Notepad".to_string()
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            logging: false,
            debug: false,
            skin_path: String::new(),
            config_editor: default_config_editor(),
            log_viewer: default_log_viewer(),
            disable_dragging: false,
            disable_version_check: false,
            language: String::new(),
            tray_execute_l: String::new(),
            tray_execute_r: String::new(),
            tray_execute_m: String::new(),
            tray_execute_dl: String::new(),
            tray_execute_dr: String::new(),
            tray_execute_dm: String::new(),
        }
    }
}

/// A global setting carried over from the previous settings file when a theme
/// replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreservedKey {
    pub key: &'static str,
    /// Overwrite the theme's value; otherwise only fill it in when the theme
    /// leaves it empty
    pub overwrite: bool,
}

pub const PRESERVED_KEYS: &[PreservedKey] = &[
    PreservedKey { key: "SkinPath", overwrite: true },
    PreservedKey { key: "ConfigEditor", overwrite: true },
    PreservedKey { key: "LogViewer", overwrite: true },
    PreservedKey { key: "Logging", overwrite: true },
    PreservedKey { key: "DisableVersionCheck", overwrite: true },
    PreservedKey { key: "Language", overwrite: true },
    PreservedKey { key: "TrayExecuteL", overwrite: false },
    PreservedKey { key: "TrayExecuteM", overwrite: false },
    PreservedKey { key: "TrayExecuteR", overwrite: false },
    PreservedKey { key: "TrayExecuteDM", overwrite: false },
    PreservedKey { key: "TrayExecuteDR", overwrite: false },
];
