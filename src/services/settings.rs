use crate::services::ini::IniDocument;
use crate::utils::{normalize_separators, starts_with_ignore_case};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::io::Write;
use thiserror::Error;

/// Supplies the list of INI files the OS keeps a separate in-memory mapping
/// for. Writes to such a file are routed through a shadow copy.
pub trait IniMappingProvider {
    fn mapped_files(&self) -> Vec<String>;
}

/// No OS-level INI mappings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIniMappings;

impl IniMappingProvider for NoIniMappings {
    fn mapped_files(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Reasons a guarded write is refused or fails. No partial write happens in
/// any of these cases.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Illegal path: {0}")]
    IllegalPath(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File is read-only: {0}")]
    ReadOnly(String),

    #[error("Failed to write to: {path}")]
    WriteFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to copy temporary file to original filepath: {path}")]
    CopyBackFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a guarded write reached the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRoute {
    /// Written in place (atomically) to the target
    Direct,
    /// Written to a shadow copy that was copied back over the target
    Shadow,
}

/// What a guarded write stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub route: WriteRoute,
    pub value: String,
}

/// Guarded key/value access to the host settings file and to skin files.
///
/// Reads come from an in-memory copy of the settings file (refreshed by
/// [`reload`](Self::reload)) and never fail: missing keys yield the default.
pub struct SettingsStore {
    settings_file: Utf8PathBuf,
    skin_root: Utf8PathBuf,
    settings_root: Utf8PathBuf,
    document: IniDocument,
    mappings: Box<dyn IniMappingProvider>,
}

impl SettingsStore {
    /// Create a store over `settings_file`. The settings root is the
    /// directory holding that file.
    pub fn new(
        settings_file: impl Into<Utf8PathBuf>,
        skin_root: impl Into<Utf8PathBuf>,
        mappings: Box<dyn IniMappingProvider>,
    ) -> Self {
        let settings_file = settings_file.into();
        let settings_root = settings_file
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();

        let document = IniDocument::load(&settings_file).unwrap_or_else(|e| {
            tracing::warn!("Settings file unreadable, starting empty: {:#}", e);
            IniDocument::new()
        });

        Self {
            settings_file,
            skin_root: skin_root.into(),
            settings_root,
            document,
            mappings,
        }
    }

    pub fn settings_file(&self) -> &Utf8Path {
        &self.settings_file
    }

    pub fn settings_root(&self) -> &Utf8Path {
        &self.settings_root
    }

    pub fn skin_root(&self) -> &Utf8Path {
        &self.skin_root
    }

    pub fn set_skin_root(&mut self, skin_root: impl Into<Utf8PathBuf>) {
        self.skin_root = skin_root.into();
    }

    /// Re-read the settings file from disk.
    pub fn reload(&mut self) {
        match IniDocument::load(&self.settings_file) {
            Ok(doc) => self.document = doc,
            Err(e) => tracing::warn!("Failed to reload settings: {:#}", e),
        }
    }

    pub fn document(&self) -> &IniDocument {
        &self.document
    }

    pub fn read_string(&self, section: &str, key: &str, default: &str) -> String {
        self.document
            .get(section, key)
            .unwrap_or(default)
            .to_string()
    }

    /// Integers accept a leading sign and ignore trailing garbage (`"3px"` is 3).
    pub fn read_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.document
            .get(section, key)
            .and_then(parse_leading_int)
            .unwrap_or(default)
    }

    pub fn read_float(&self, section: &str, key: &str, default: f64) -> f64 {
        self.document
            .get(section, key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(default)
    }

    pub fn read_section(&self, section: &str) -> IndexMap<String, String> {
        self.document.section_entries(section)
    }

    /// Write a value to the host settings file.
    pub fn write(&mut self, section: &str, key: &str, value: &str) -> anyhow::Result<()> {
        self.document.set(section, key, value);
        self.document.save_atomic(&self.settings_file)
    }

    /// Remove a key from the host settings file.
    pub fn remove(&mut self, section: &str, key: &str) -> anyhow::Result<()> {
        if self.document.remove_key(section, key) {
            self.document.save_atomic(&self.settings_file)?;
        }
        Ok(())
    }

    /// Remove a whole section from the host settings file.
    pub fn remove_section(&mut self, section: &str) -> anyhow::Result<()> {
        if self.document.remove_section(section) {
            self.document.save_atomic(&self.settings_file)?;
        }
        Ok(())
    }

    /// Check that the settings file can be written and read back.
    pub fn test_writable(&mut self) -> bool {
        const PROBE_SECTION: &str = "Rainmeter";
        const PROBE_KEY: &str = "WriteTest";

        if let Err(e) = self.write(PROBE_SECTION, PROBE_KEY, "TRUE") {
            tracing::error!("Settings file is not writable: {:#}", e);
            self.reload();
            return false;
        }

        let on_disk = IniDocument::load(&self.settings_file)
            .map(|doc| doc.get(PROBE_SECTION, PROBE_KEY) == Some("TRUE"))
            .unwrap_or(false);

        if let Err(e) = self.remove(PROBE_SECTION, PROBE_KEY) {
            tracing::warn!("Failed to remove write probe: {:#}", e);
        }
        on_disk
    }

    /// Write `section`/`key` in an existing INI file under the skin root or the
    /// settings root.
    ///
    /// The checks run in a fixed order: traversal segments, root prefix, file
    /// existence, read-only flag. When `formula` is given and evaluates
    /// `value`, the computed number is written instead of the literal text.
    pub fn write_guarded(
        &self,
        target: &str,
        section: &str,
        key: &str,
        value: &str,
        formula: Option<&dyn Fn(&str) -> Option<f64>>,
    ) -> Result<WriteOutcome, SettingsError> {
        if has_traversal_segment(target) {
            tracing::error!("!WriteKeyValue: Illegal path: {}", target);
            return Err(SettingsError::IllegalPath(target.to_string()));
        }

        if !self.is_under_roots(target) {
            tracing::error!("!WriteKeyValue: Illegal path: {}", target);
            return Err(SettingsError::IllegalPath(target.to_string()));
        }

        let target_path = Utf8Path::new(target);
        let metadata = match fs::metadata(target_path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                tracing::error!("!WriteKeyValue: File not found: {}", target);
                return Err(SettingsError::FileNotFound(target.to_string()));
            }
        };

        if metadata.permissions().readonly() {
            tracing::warn!("!WriteKeyValue: File is read-only: {}", target);
            return Err(SettingsError::ReadOnly(target.to_string()));
        }

        let value = match formula.and_then(|eval| eval(value)) {
            Some(number) => crate::utils::format_trimmed(number),
            None => value.to_string(),
        };

        if self.is_mapped(target_path) {
            self.write_through_shadow(target_path, section, key, &value)?;
            return Ok(WriteOutcome {
                route: WriteRoute::Shadow,
                value,
            });
        }

        tracing::debug!("!WriteKeyValue: Writing to: {}", target);
        let mut doc = IniDocument::load(target_path).map_err(|source| SettingsError::WriteFailed {
            path: target.to_string(),
            source,
        })?;
        doc.set(section, key, &value);
        doc.save_atomic(target_path).map_err(|source| {
            tracing::error!("!WriteKeyValue: Failed to write to: {}", target);
            SettingsError::WriteFailed {
                path: target.to_string(),
                source,
            }
        })?;

        Ok(WriteOutcome {
            route: WriteRoute::Direct,
            value,
        })
    }

    fn is_under_roots(&self, target: &str) -> bool {
        let target = normalize_separators(target);
        [&self.skin_root, &self.settings_root]
            .iter()
            .map(|root| normalize_separators(root.as_str()))
            .filter(|root| !root.is_empty())
            .map(|mut root| {
                // Roots are directories; a sibling sharing the name prefix is outside
                if !root.ends_with('/') {
                    root.push('/');
                }
                root
            })
            .any(|root| starts_with_ignore_case(&target, &root))
    }

    fn is_mapped(&self, target: &Utf8Path) -> bool {
        let Some(file_name) = target.file_name() else {
            return false;
        };
        self.mappings
            .mapped_files()
            .iter()
            .any(|mapped| crate::utils::eq_ignore_case(mapped, file_name))
    }

    /// Edit a temporary copy, flush it, copy it back over the target. The
    /// shadow file is removed on every path out of this function.
    fn write_through_shadow(
        &self,
        target: &Utf8Path,
        section: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        let write_failed = |source: anyhow::Error| SettingsError::WriteFailed {
            path: target.to_string(),
            source,
        };

        let mut shadow = tempfile::Builder::new()
            .prefix("skinhost-")
            .suffix(".ini")
            .tempfile()
            .map_err(|e| write_failed(e.into()))?;

        tracing::debug!(
            "!WriteKeyValue: Writing to: {} (Temp: {})",
            target,
            shadow.path().display()
        );

        let mut doc = IniDocument::load(target).map_err(write_failed)?;
        doc.set(section, key, value);
        shadow
            .write_all(doc.to_string().as_bytes())
            .and_then(|_| shadow.as_file().sync_all())
            .map_err(|e| {
                tracing::error!(
                    "!WriteKeyValue: Failed to write to: {} (Temp: {})",
                    target,
                    shadow.path().display()
                );
                write_failed(e.into())
            })?;

        fs::copy(shadow.path(), target).map_err(|source| {
            tracing::error!(
                "!WriteKeyValue: Failed to copy temporary file to original filepath: {} (Temp: {})",
                target,
                shadow.path().display()
            );
            SettingsError::CopyBackFailed {
                path: target.to_string(),
                source,
            }
        })?;

        Ok(())
    }
}

/// True when any path segment is `..`, for either separator style.
pub fn has_traversal_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits_end = text
        .char_indices()
        .skip_while(|&(i, c)| i == 0 && (c == '-' || c == '+'))
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i);
    text[..digits_end].parse().ok()
}
