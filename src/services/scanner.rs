//! Skin tree discovery.
//!
//! Every folder below the skin root that holds at least one `.ini` file is a
//! config; its name is the folder path relative to the root joined with `\`.
//! The same walk builds the folder-shaped menu, dropping folders that end up
//! with nothing selectable in them.

use crate::models::skin::{CONFIG_COMMAND_FIRST, MenuNode, SkinConfig};
use crate::utils::{NAME_SEPARATOR, eq_ignore_case};
use camino::Utf8Path;
use std::fs;
use std::io;

/// Folder directly under the skin root that is never scanned.
pub const BACKUP_FOLDER: &str = "Backup";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Directory enumeration used by the scanner. The scanner keeps whatever
/// order the lister returns.
pub trait DirectoryLister {
    fn list(&self, dir: &Utf8Path) -> io::Result<Vec<DirEntry>>;
}

impl<L: DirectoryLister + ?Sized> DirectoryLister for Box<L> {
    fn list(&self, dir: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        (**self).list(dir)
    }
}

/// Lists the real filesystem, sorted case-insensitively by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, dir: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!("Skipping non UTF-8 entry in {}", dir);
                continue;
            };
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry { name, is_dir });
        }
        entries.sort_by_cached_key(|e| e.name.to_lowercase());
        Ok(entries)
    }
}

/// Flat config list plus menu tree produced by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub configs: Vec<SkinConfig>,
    pub menu: Vec<MenuNode>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Walks a skin root with a [`DirectoryLister`].
pub struct ConfigScanner<L: DirectoryLister = FsLister> {
    lister: L,
}

impl Default for ConfigScanner<FsLister> {
    fn default() -> Self {
        Self::new(FsLister)
    }
}

impl<L: DirectoryLister> ConfigScanner<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    /// Scan `root`. An unreadable folder contributes nothing.
    pub fn scan(&self, root: &Utf8Path) -> ScanResult {
        let mut walk = Walk {
            configs: Vec::new(),
            next_command: CONFIG_COMMAND_FIRST,
        };
        let menu = self.scan_folder(root, "", &mut walk);

        tracing::debug!("Scanned {}: {} configs", root, walk.configs.len());
        ScanResult {
            configs: walk.configs,
            menu,
        }
    }

    fn scan_folder(&self, dir: &Utf8Path, base: &str, walk: &mut Walk) -> Vec<MenuNode> {
        let entries = match self.lister.list(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Unable to read skin folder {}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut nodes = Vec::new();

        if !base.is_empty() {
            let variants: Vec<String> = entries
                .iter()
                .filter(|e| !e.is_dir && has_ini_extension(&e.name))
                .map(|e| e.name.clone())
                .collect();

            let duplicate = walk
                .configs
                .iter()
                .any(|config| eq_ignore_case(&config.name, base));
            if duplicate && !variants.is_empty() {
                tracing::warn!(
                    "Skipping {} in {}: a config with the same name already exists",
                    base,
                    dir
                );
            } else if !variants.is_empty() {
                let config_index = walk.configs.len();
                let mut config = SkinConfig::new(base);

                for (variant_index, variant) in variants.into_iter().enumerate() {
                    nodes.push(MenuNode::Variant {
                        name: variant.clone(),
                        config_index,
                        variant_index,
                    });
                    config.commands.push(walk.next_command);
                    config.variants.push(variant);
                    walk.next_command += 1;
                }
                walk.configs.push(config);
            }
        }

        for folder in entries.iter().filter(|e| e.is_dir) {
            if folder.name == "." || folder.name == ".." {
                continue;
            }
            if base.is_empty() && folder.name == BACKUP_FOLDER {
                continue;
            }

            let name = if base.is_empty() {
                folder.name.clone()
            } else {
                format!("{base}{NAME_SEPARATOR}{}", folder.name)
            };

            let children = self.scan_folder(&dir.join(&folder.name), &name, walk);
            if !children.is_empty() {
                nodes.push(MenuNode::Folder {
                    name: folder.name.clone(),
                    children,
                });
            }
        }

        nodes
    }
}

struct Walk {
    configs: Vec<SkinConfig>,
    next_command: u32,
}

fn has_ini_extension(file: &str) -> bool {
    Utf8Path::new(file)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"))
}
