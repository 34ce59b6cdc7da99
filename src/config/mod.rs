use crate::models::options::{GLOBAL_SECTION, HostOptions};
use crate::services::ini::IniDocument;
use crate::utils::expand_env_vars;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError, Environment, Map, Source, Value, ValueKind};
use indexmap::IndexMap;
use std::fs;

/// Settings filename used when none is given.
pub const SETTINGS_FILE_NAME: &str = "Rainmeter.ini";

/// Prefix of environment overrides (`SKINHOST_DEBUG=1`).
pub const ENV_PREFIX: &str = "SKINHOST";

/// Every filesystem location the host works with.
///
/// Resolved once at startup; the skin root is filled in after the global
/// options have been read (see [`resolve_skin_root`](Self::resolve_skin_root)).
#[derive(Debug, Clone, PartialEq)]
pub struct HostPaths {
    pub program_dir: Utf8PathBuf,
    pub settings_file: Utf8PathBuf,
    pub settings_dir: Utf8PathBuf,
    pub log_file: Utf8PathBuf,
    pub stats_file: Utf8PathBuf,
    pub skin_root: Utf8PathBuf,

    /// The settings file sits in the per-user default location
    pub default_location: bool,
}

impl HostPaths {
    /// Find (and create if needed) the settings file.
    ///
    /// # Arguments
    /// * `program_dir` - Directory of the host executable
    /// * `settings_arg` - Explicit settings file or folder from the command line
    pub fn resolve(program_dir: &Utf8Path, settings_arg: Option<&str>) -> Result<Self> {
        let user_default = dirs::config_dir()
            .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
            .map(|dir| dir.join("Rainmeter").join(SETTINGS_FILE_NAME));
        Self::resolve_with_default(program_dir, settings_arg, user_default)
    }

    /// [`resolve`](Self::resolve) with the per-user default location supplied
    /// by the caller.
    pub fn resolve_with_default(
        program_dir: &Utf8Path,
        settings_arg: Option<&str>,
        user_default: Option<Utf8PathBuf>,
    ) -> Result<Self> {
        let mut default_location = false;

        let settings_file = match settings_arg.map(str::trim).filter(|a| !a.is_empty()) {
            Some(arg) => explicit_settings_file(program_dir, arg),
            None => {
                let portable = program_dir.join(SETTINGS_FILE_NAME);
                match user_default {
                    Some(user_file) if !portable.exists() => {
                        default_location = true;
                        user_file
                    }
                    _ => portable,
                }
            }
        };

        let settings_dir = settings_file
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| program_dir.to_path_buf());

        if !settings_dir.exists() {
            fs::create_dir_all(&settings_dir)
                .with_context(|| format!("Failed to create settings directory: {}", settings_dir))?;
        }

        if !settings_file.exists() {
            create_settings_file(program_dir, &settings_file)?;
        }

        tracing::info!("Using settings file: {}", settings_file);

        Ok(Self {
            program_dir: program_dir.to_path_buf(),
            log_file: settings_file.with_extension("log"),
            stats_file: settings_file.with_extension("stats"),
            skin_root: program_dir.join("Skins"),
            settings_dir,
            settings_file,
            default_location,
        })
    }

    /// Pick the skin root from the `SkinPath` option.
    ///
    /// # Returns
    /// `true` when the root was chosen here and should be written back as
    /// `SkinPath`
    pub fn resolve_skin_root(&mut self, skin_path: &str) -> Result<bool> {
        let skin_path = skin_path.trim();
        if !skin_path.is_empty() {
            self.skin_root = Utf8PathBuf::from(expand_env_vars(skin_path));
            return Ok(false);
        }

        let documents = dirs::document_dir().and_then(|dir| Utf8PathBuf::try_from(dir).ok());
        match documents {
            Some(documents) if self.default_location => {
                let root = documents.join("Rainmeter").join("Skins");
                fs::create_dir_all(&root)
                    .with_context(|| format!("Failed to create skin folder: {}", root))?;
                self.skin_root = root;
                Ok(true)
            }
            _ => {
                self.skin_root = self.program_dir.join("Skins");
                Ok(false)
            }
        }
    }

    /// `SkinPath` as written back to the settings file, with a trailing
    /// separator.
    pub fn skin_path_setting(&self) -> String {
        let mut path = self.skin_root.to_string();
        if !path.ends_with(['/', '\\']) {
            path.push(std::path::MAIN_SEPARATOR);
        }
        path
    }
}

fn explicit_settings_file(program_dir: &Utf8Path, arg: &str) -> Utf8PathBuf {
    let arg = arg.trim_matches('"');
    let expanded = expand_env_vars(arg);
    let mut path = Utf8PathBuf::from(&expanded);

    let is_ini = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
    if expanded.ends_with(['/', '\\']) || path.is_dir() || !is_ini {
        path.push(SETTINGS_FILE_NAME);
    }

    if path.is_relative() {
        path = program_dir.join(path);
    }
    path
}

fn create_settings_file(program_dir: &Utf8Path, settings_file: &Utf8Path) -> Result<()> {
    let default_ini = program_dir.join("Default.ini");
    if default_ini.is_file() {
        fs::copy(&default_ini, settings_file)
            .with_context(|| format!("Failed to copy {} to {}", default_ini, settings_file))?;
        tracing::info!("Created settings file from {}", default_ini);
    } else {
        fs::write(settings_file, format!("[{GLOBAL_SECTION}]\n"))
            .with_context(|| format!("Failed to create settings file: {}", settings_file))?;
        tracing::info!("Created empty settings file: {}", settings_file);
    }
    Ok(())
}

/// The `[Rainmeter]` section of the settings file as a `config` source.
#[derive(Debug, Clone)]
struct GlobalSection {
    origin: String,
    entries: IndexMap<String, String>,
}

impl Source for GlobalSection {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self
            .entries
            .iter()
            .map(|(key, value)| {
                (
                    key.to_lowercase(),
                    Value::new(Some(&self.origin), ValueKind::String(value.clone())),
                )
            })
            .collect())
    }
}

/// Load the global options: built-in defaults, then the settings file, then
/// `SKINHOST_*` environment variables.
pub fn load_options(settings_file: &Utf8Path) -> Result<HostOptions> {
    load_options_with_env(settings_file, None)
}

/// [`load_options`] with an explicit environment instead of the process one.
pub fn load_options_with_env(
    settings_file: &Utf8Path,
    env: Option<Map<String, String>>,
) -> Result<HostOptions> {
    let document = IniDocument::load(settings_file)?;

    let section = GlobalSection {
        origin: settings_file.to_string(),
        entries: document.section_entries(GLOBAL_SECTION),
    };

    let options: HostOptions = Config::builder()
        .add_source(section)
        .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
        .build()
        .with_context(|| format!("Failed to read options from {}", settings_file))?
        .try_deserialize()
        .with_context(|| format!("Invalid options in {}", settings_file))?;

    tracing::debug!("Loaded host options: {:?}", options);
    Ok(options)
}
