use crate::models::options::{GLOBAL_SECTION, PRESERVED_KEYS};
use crate::services::ini::IniDocument;
use crate::utils::eq_ignore_case;
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Theme holding the settings file that was replaced by the last theme load.
pub const BACKUP_THEME: &str = "Backup";

/// Settings snapshot file inside each theme folder.
pub const THEME_FILE: &str = "Rainmeter.thm";

/// Saved settings snapshots under `<settings dir>/Themes`.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    themes_dir: Utf8PathBuf,
    themes: Vec<String>,
}

impl ThemeStore {
    pub fn new(settings_dir: &Utf8Path) -> Self {
        Self {
            themes_dir: settings_dir.join("Themes"),
            themes: Vec::new(),
        }
    }

    pub fn themes_dir(&self) -> &Utf8Path {
        &self.themes_dir
    }

    /// Theme names from the last scan, sorted.
    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    /// Re-read the theme folder list. A missing themes folder means no themes.
    pub fn scan(&mut self) {
        self.themes.clear();

        let entries = match fs::read_dir(&self.themes_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("No themes in {}: {}", self.themes_dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if let (true, Ok(name)) = (is_dir, entry.file_name().into_string()) {
                self.themes.push(name);
            }
        }
        self.themes.sort_by_cached_key(|name| name.to_lowercase());
    }

    pub fn theme_file(&self, name: &str) -> Utf8PathBuf {
        self.themes_dir.join(name).join(THEME_FILE)
    }

    /// Replace `settings_file` with the theme's snapshot.
    ///
    /// Loading [`BACKUP_THEME`] restores the backup as is. Any other theme
    /// first backs the current settings up, then keeps the global keys listed
    /// in [`PRESERVED_KEYS`] from that backup.
    pub fn apply(&self, name: &str, settings_file: &Utf8Path) -> Result<()> {
        let theme_file = self.theme_file(name);
        if !theme_file.is_file() {
            bail!("Theme not found: {}", theme_file);
        }

        if eq_ignore_case(name, BACKUP_THEME) {
            fs::copy(&theme_file, settings_file)
                .with_context(|| format!("Failed to restore backup theme: {}", theme_file))?;
            tracing::info!("Restored settings from backup theme");
            return Ok(());
        }

        let backup_file = self.theme_file(BACKUP_THEME);
        if let Some(dir) = backup_file.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create backup theme folder: {}", dir))?;
        }
        fs::copy(settings_file, &backup_file)
            .with_context(|| format!("Failed to back up settings to {}", backup_file))?;
        fs::copy(&theme_file, settings_file)
            .with_context(|| format!("Failed to copy theme {} over settings", theme_file))?;

        let backup = IniDocument::load(&backup_file)?;
        let mut settings = IniDocument::load(settings_file)?;
        let mut changed = false;

        for preserved in PRESERVED_KEYS {
            let keep = preserved.overwrite
                || settings
                    .get(GLOBAL_SECTION, preserved.key)
                    .is_none_or(str::is_empty);
            let previous = backup
                .get(GLOBAL_SECTION, preserved.key)
                .filter(|v| !v.is_empty());

            if let (true, Some(value)) = (keep, previous) {
                settings.set(GLOBAL_SECTION, preserved.key, value);
                changed = true;
            }
        }

        if changed {
            settings.save_atomic(settings_file)?;
        }

        tracing::info!("Loaded theme: {}", name);
        Ok(())
    }
}
