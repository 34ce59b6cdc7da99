use crate::services::ini::IniDocument;
use crate::services::settings::SettingsStore;
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

pub const STATS_SECTION: &str = "Statistics";

/// Key stamped with the time the counters were last reset.
pub const SINCE_KEY: &str = "Since";

/// Accumulated statistics kept in their own file beside the settings file.
///
/// The counters are produced elsewhere; this store only persists them.
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: Utf8PathBuf,
    values: IndexMap<String, String>,
}

impl StatsStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: IndexMap::new(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Move `[Statistics]` out of the main settings file when the stats file
    /// does not exist yet.
    pub fn migrate(&self, settings: &mut SettingsStore) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        let legacy = settings.read_section(STATS_SECTION);
        if legacy.is_empty() {
            return Ok(false);
        }

        let mut doc = IniDocument::new();
        doc.replace_section(STATS_SECTION, &legacy);
        doc.save_atomic(&self.path)?;
        settings.remove_section(STATS_SECTION)?;

        tracing::info!("Moved statistics to {}", self.path);
        Ok(true)
    }

    /// Read the stored counters.
    pub fn read(&mut self) -> Result<()> {
        self.values = IniDocument::load(&self.path)?.section_entries(STATS_SECTION);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| crate::utils::eq_ignore_case(k, key))
            .map(|(_, v)| v.as_str())
    }

    pub fn since(&self) -> Option<&str> {
        self.get(SINCE_KEY)
    }

    pub fn record(&mut self, key: &str, value: impl ToString) {
        let existing = self
            .values
            .keys()
            .find(|k| crate::utils::eq_ignore_case(k, key))
            .cloned();
        self.values
            .insert(existing.unwrap_or_else(|| key.to_string()), value.to_string());
    }

    pub fn write(&self) -> Result<()> {
        let mut doc = IniDocument::load(&self.path)?;
        doc.replace_section(STATS_SECTION, &self.values);
        doc.save_atomic(&self.path)
    }

    /// Clear every counter and start a new period at the current local time.
    pub fn reset(&mut self) -> Result<()> {
        self.values.clear();
        let since = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
        self.values.insert(SINCE_KEY.to_string(), since);
        self.write()?;
        tracing::info!("Statistics reset");
        Ok(())
    }
}
